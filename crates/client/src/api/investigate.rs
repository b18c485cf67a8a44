//! Natural-language investigation: the backend turns a question into a
//! database query and optionally runs it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::required;
use crate::auth::AuthClient;
use crate::error::Result;

/// Generated query, with its result when it was executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigateResult {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub mongo_query: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub execution_time: Option<u64>,
    #[serde(default)]
    pub ai_response: Option<String>,
}

impl InvestigateResult {
    /// Number of rows the executed query returned.
    pub fn row_count(&self) -> Option<usize> {
        match &self.result {
            Some(Value::Array(rows)) => Some(rows.len()),
            _ => None,
        }
    }
}

pub struct InvestigateApi<'a> {
    client: &'a AuthClient,
}

impl<'a> InvestigateApi<'a> {
    pub(crate) fn new(client: &'a AuthClient) -> Self {
        Self { client }
    }

    /// Generate the query without running it.
    pub async fn generate(&self, question: &str) -> Result<InvestigateResult> {
        let question = required("question", question)?;
        self.client
            .post("investigate-ai/generate", &json!({ "question": question }))
            .await
    }

    /// Generate and run the query.
    pub async fn query(&self, question: &str) -> Result<InvestigateResult> {
        let question = required("question", question)?;
        self.client
            .post("investigate-ai/query", &json!({ "question": question }))
            .await
    }
}
