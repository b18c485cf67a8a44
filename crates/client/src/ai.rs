//! Client for the AI side services (report chat and entry prediction).
//!
//! These endpoints are unauthenticated and live on their own base URL.

use parkwatch_core::config::BackendConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::transport::{base_url, join_url, HttpRequest, HttpTransport, Method, ReqwestTransport};

/// Answer of the report chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct AiClient {
    base: Url,
    transport: Arc<dyn HttpTransport>,
}

impl AiClient {
    pub fn new(ai_base_url: &str, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        Ok(Self {
            base: base_url(ai_base_url)?,
            transport,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(&config.ai_base_url, Arc::new(ReqwestTransport::new(config)?))
    }

    /// Ask a question about `context` (usually a report's data as text).
    /// An `error` in the reply body is returned as an error.
    pub async fn rag_query(&self, query: &str, context: &str) -> Result<String> {
        if query.trim().is_empty() {
            return Err(ClientError::Argument("query is required".to_string()));
        }
        let answer: RagAnswer = self
            .post("rag_query", json!({ "query": query, "context": context }))
            .await?;
        match (answer.response, answer.error) {
            (_, Some(error)) if !error.trim().is_empty() => Err(ClientError::Server {
                status: 200,
                message: error,
            }),
            (Some(response), _) => Ok(response),
            (None, _) => Err(ClientError::Decode(
                "AI reply carried neither response nor error".to_string(),
            )),
        }
    }

    /// Predicted entries for the given timestamps. The prediction shape is
    /// owned by the model service and passed through as is.
    pub async fn predict_entries(&self, timestamps: &[String]) -> Result<Value> {
        self.post("predict", json!({ "timestamps": timestamps })).await
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        let url = join_url(&self.base, path, &[])?;
        debug!(%url, "AI request");
        let request = HttpRequest::new(Method::Post, url).json(body);
        self.transport.send(request).await?.error_for_status()?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Canned {
        reply: HttpResponse,
        seen: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl HttpTransport for Canned {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    fn client(reply: HttpResponse) -> (AiClient, Arc<Canned>) {
        let transport = Arc::new(Canned {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        (
            AiClient::new("http://localhost:5001/api", transport.clone()).unwrap(),
            transport,
        )
    }

    #[tokio::test]
    async fn rag_query_posts_without_credentials() {
        let (ai, transport) = client(HttpResponse::json_body(
            200,
            &json!({ "response": "Occupancy peaked at 9am." }),
        ));
        let answer = ai.rag_query("When was it busiest?", "09:00 95%").await.unwrap();
        assert_eq!(answer, "Occupancy peaked at 9am.");

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].url.as_str(), "http://localhost:5001/api/rag_query");
        assert!(seen[0].bearer.is_none());
        assert_eq!(
            seen[0].body,
            Some(json!({ "query": "When was it busiest?", "context": "09:00 95%" }))
        );
    }

    #[tokio::test]
    async fn error_field_is_surfaced() {
        let (ai, _) = client(HttpResponse::json_body(500, &json!({ "error": "model offline" })));
        let err = ai.rag_query("q", "ctx").await.unwrap_err();
        assert_eq!(err.to_string(), "Server error (500): model offline");

        let (ai, _) = client(HttpResponse::json_body(200, &json!({ "error": "context too long" })));
        assert!(matches!(
            ai.rag_query("q", "ctx").await,
            Err(ClientError::Server { message, .. }) if message == "context too long"
        ));
    }
}
