//! HTTP transport seam.
//!
//! The auth client talks to the network only through [`HttpTransport`], so the
//! refresh protocol can be driven by a scripted transport in tests and by
//! [`ReqwestTransport`] everywhere else.

use async_trait::async_trait;
use parkwatch_core::config::BackendConfig;
use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// HTTP verbs the backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    /// Bearer token for the `Authorization` header.
    pub bearer: Option<String>,
    /// Cookies sent as a `Cookie` header.
    pub cookies: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            bearer: None,
            cookies: Vec::new(),
            body: None,
        }
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Buffered response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Set-Cookie` header values.
    pub set_cookies: Vec<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            set_cookies: Vec::new(),
            body: body.into(),
        }
    }

    /// JSON response with the given status.
    pub fn json_body(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string().into_bytes())
    }

    pub fn with_set_cookie(mut self, header: impl Into<String>) -> Self {
        self.set_cookies.push(header.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body. An empty body reads as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(Value::Null)
                .map_err(|e| ClientError::Decode(format!("empty response body: {}", e)));
        }
        serde_json::from_slice(&self.body).map_err(|e| {
            ClientError::Decode(format!(
                "unexpected response body ({}): {}",
                e,
                preview(&self.text())
            ))
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Message the server put in the body (`message`, then `error`), or the
    /// body text, or the bare status.
    pub fn error_message(&self) -> String {
        if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(&self.body) {
            for key in ["message", "error"] {
                if let Some(Value::String(message)) = map.get(key) {
                    if !message.trim().is_empty() {
                        return message.clone();
                    }
                }
            }
        }
        let text = self.text();
        if text.trim().is_empty() {
            format!("HTTP {}", self.status)
        } else {
            preview(text.trim())
        }
    }

    /// Turn a non-2xx response into the matching [`ClientError`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_status(self.status, self.error_message()))
        }
    }

    /// Value of cookie `name` from the `Set-Cookie` headers. An empty value
    /// means the server cleared the cookie.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies.iter().rev().find_map(|header| {
            let pair = header.split(';').next()?;
            let (key, value) = pair.split_once('=')?;
            (key.trim() == name).then(|| value.trim().trim_matches('"').to_string())
        })
    }
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let cut: String = text.chars().take(LIMIT).collect();
        format!("{}...", cut)
    }
}

/// Something that can execute an [`HttpRequest`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the configured timeouts. Redirects are not
    /// followed.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("parkwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone())
            .header(CONTENT_TYPE, "application/json");

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if !request.cookies.is_empty() {
            let header = request
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(COOKIE, header);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            ClientError::Network(format!("{} {} failed: {}", request.method, request.url, e))
        })?;

        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(format!("Failed to read response body: {}", e)))?
            .to_vec();

        Ok(HttpResponse {
            status,
            set_cookies,
            body,
        })
    }
}

/// Parse a base URL and make sure relative paths resolve beneath it.
pub fn base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| ClientError::Config(format!("Invalid base URL {:?}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Config(format!(
            "Base URL must be http or https: {}",
            raw
        )));
    }
    Ok(url)
}

/// Resolve `path` against `base` and append `query`.
pub fn join_url(base: &Url, path: &str, query: &[(&str, String)]) -> Result<Url> {
    let mut url = base
        .join(path.trim_start_matches('/'))
        .map_err(|e| ClientError::Config(format!("Invalid path {:?}: {}", path, e)))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_keeps_api_prefix() {
        let base = base_url("http://localhost:1313/api").unwrap();
        let url = join_url(
            &base,
            "/parking/vehicle/a1/all-records",
            &[("page", "2".to_string()), ("limit", "10".to_string())],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1313/api/parking/vehicle/a1/all-records?page=2&limit=10"
        );
    }

    #[test]
    fn base_url_rejects_other_schemes() {
        assert!(matches!(
            base_url("ws://localhost:1313"),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn error_message_prefers_body_message() {
        let response = HttpResponse::json_body(
            400,
            &json!({ "success": false, "message": "Blacklist already exists" }),
        );
        assert_eq!(response.error_message(), "Blacklist already exists");
        assert_eq!(
            response.error_for_status(),
            Err(ClientError::Validation {
                status: 400,
                message: "Blacklist already exists".to_string()
            })
        );

        let ai = HttpResponse::json_body(500, &json!({ "error": "model offline" }));
        assert_eq!(ai.error_message(), "model offline");

        assert_eq!(HttpResponse::new(502, Vec::new()).error_message(), "HTTP 502");
    }

    #[test]
    fn refresh_cookie_is_extracted() {
        let response = HttpResponse::new(200, b"{}".to_vec())
            .with_set_cookie("sid=1; Path=/")
            .with_set_cookie("refreshToken=abc.def; Path=/; HttpOnly; SameSite=Strict");
        assert_eq!(response.cookie("refreshToken").as_deref(), Some("abc.def"));
        assert_eq!(response.cookie("missing"), None);

        let cleared = HttpResponse::new(200, Vec::new())
            .with_set_cookie("refreshToken=; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(cleared.cookie("refreshToken").as_deref(), Some(""));
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let response = HttpResponse::new(204, Vec::new());
        let value: Option<Value> = response.json().unwrap();
        assert!(value.is_none());
    }
}
