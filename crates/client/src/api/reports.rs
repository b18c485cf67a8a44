//! Saved reports.

use parkwatch_core::types::{NewReport, Report};
use serde_json::{json, Value};
use tracing::info;

use super::{required, segment, unwrap_data, Ack};
use crate::auth::AuthClient;
use crate::error::Result;

pub struct ReportsApi<'a> {
    client: &'a AuthClient,
}

impl<'a> ReportsApi<'a> {
    pub(crate) fn new(client: &'a AuthClient) -> Self {
        Self { client }
    }

    /// Report summaries, newest first.
    pub async fn list(&self) -> Result<Vec<Report>> {
        let reply: Value = self.client.get("reports", &[]).await?;
        unwrap_data(reply)
    }

    pub async fn get(&self, report_id: &str) -> Result<Report> {
        let id = segment("report id", report_id)?;
        let reply: Value = self.client.get(&format!("reports/{}", id), &[]).await?;
        unwrap_data(reply)
    }

    pub async fn save(&self, report: &NewReport) -> Result<Report> {
        required("report name", &report.name)?;
        segment("area id", &report.area_id)?;
        let reply: Value = self.client.post("reports", report).await?;
        let saved: Report = unwrap_data(reply)?;
        info!(id = %saved.id, name = %saved.name, "report saved");
        Ok(saved)
    }

    pub async fn delete(&self, report_id: &str) -> Result<Ack> {
        let id = segment("report id", report_id)?;
        let ack = self.client.delete(&format!("reports/{}", id), &[]).await?;
        info!(id, "report deleted");
        Ok(ack)
    }

    /// Ask the backend to answer a question about a report's data.
    pub async fn analyze(&self, report_id: &str, question: &str) -> Result<Value> {
        let id = segment("report id", report_id)?;
        let question = required("question", question)?;
        self.client
            .post(
                &format!("reports/{}/analyze", id),
                &json!({ "question": question }),
            )
            .await
    }
}
