//! Sharing reports with users of the same business.

use parkwatch_core::types::{ReportShare, UserRef};
use serde_json::{json, Value};
use tracing::info;

use super::{segment, unwrap_data, Ack};
use crate::auth::AuthClient;
use crate::error::{ClientError, Result};

pub struct SharesApi<'a> {
    client: &'a AuthClient,
}

impl<'a> SharesApi<'a> {
    pub(crate) fn new(client: &'a AuthClient) -> Self {
        Self { client }
    }

    /// Users a report can be shared with.
    pub async fn business_users(&self) -> Result<Vec<UserRef>> {
        let reply: Value = self.client.get("shares/business/users", &[]).await?;
        unwrap_data(reply)
    }

    pub async fn list(&self, report_id: &str) -> Result<Vec<ReportShare>> {
        let id = segment("report id", report_id)?;
        let reply: Value = self.client.get(&format!("shares/{}", id), &[]).await?;
        unwrap_data(reply)
    }

    /// Share a report with each of `user_ids`.
    pub async fn share(&self, report_id: &str, user_ids: &[String]) -> Result<Vec<ReportShare>> {
        let report_id = segment("report id", report_id)?;
        if user_ids.is_empty() {
            return Err(ClientError::Argument(
                "at least one user id is required".to_string(),
            ));
        }
        for id in user_ids {
            segment("user id", id)?;
        }
        let reply: Value = self
            .client
            .post(
                "shares",
                &json!({ "reportId": report_id, "userIds": user_ids }),
            )
            .await?;
        let shares: Vec<ReportShare> = unwrap_data(reply)?;
        info!(report_id, users = user_ids.len(), "report shared");
        Ok(shares)
    }

    pub async fn remove(&self, share_id: &str) -> Result<Ack> {
        let id = segment("share id", share_id)?;
        self.client.delete(&format!("shares/{}", id), &[]).await
    }
}
