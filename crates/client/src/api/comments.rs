//! Comment threads on reports.

use parkwatch_core::types::Comment;
use serde_json::{json, Value};

use super::{required, segment, unwrap_data, Ack};
use crate::auth::AuthClient;
use crate::error::Result;

pub struct CommentsApi<'a> {
    client: &'a AuthClient,
}

impl<'a> CommentsApi<'a> {
    pub(crate) fn new(client: &'a AuthClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, report_id: &str) -> Result<Vec<Comment>> {
        let id = segment("report id", report_id)?;
        let reply: Value = self.client.get(&format!("comments/{}", id), &[]).await?;
        unwrap_data(reply)
    }

    pub async fn add(&self, report_id: &str, content: &str) -> Result<Comment> {
        let report_id = segment("report id", report_id)?;
        let content = required("comment", content)?;
        let reply: Value = self
            .client
            .post(
                "comments",
                &json!({ "reportId": report_id, "content": content }),
            )
            .await?;
        unwrap_data(reply)
    }

    pub async fn edit(&self, comment_id: &str, content: &str) -> Result<Comment> {
        let id = segment("comment id", comment_id)?;
        let content = required("comment", content)?;
        let reply: Value = self
            .client
            .put(&format!("comments/{}", id), &json!({ "content": content }))
            .await?;
        unwrap_data(reply)
    }

    pub async fn delete(&self, comment_id: &str) -> Result<Ack> {
        let id = segment("comment id", comment_id)?;
        self.client.delete(&format!("comments/{}", id), &[]).await
    }
}
