//! Blacklisted plates.
//!
//! Plates are stored upper-case without surrounding whitespace; every call
//! normalizes its plate argument the same way before it leaves the client.

use parkwatch_core::types::{BlacklistEntry, Page};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{page_query, required, segment, unwrap_data};
use crate::auth::AuthClient;
use crate::error::{ClientError, Result};

/// Reply of the quick plate check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistStatus {
    #[serde(default)]
    pub is_blacklisted: bool,
    #[serde(default, alias = "data")]
    pub entry: Option<BlacklistEntry>,
}

/// Trim and upper-case a plate number.
pub fn normalize_plate(plate: &str) -> Result<String> {
    let plate = plate.trim().to_uppercase();
    if plate.is_empty() {
        return Err(ClientError::Argument("plate number is required".to_string()));
    }
    Ok(plate)
}

pub struct BlacklistApi<'a> {
    client: &'a AuthClient,
}

impl<'a> BlacklistApi<'a> {
    pub(crate) fn new(client: &'a AuthClient) -> Self {
        Self { client }
    }

    pub async fn add(&self, business_id: &str, plate: &str, reason: &str) -> Result<BlacklistEntry> {
        let business_id = required("business id", business_id)?;
        let reason = required("reason", reason)?;
        let plate = normalize_plate(plate)?;
        let reply: Value = self
            .client
            .post(
                "blacklist",
                &json!({ "businessId": business_id, "plateNumber": plate, "reason": reason }),
            )
            .await?;
        let entry: BlacklistEntry = unwrap_data(reply)?;
        info!(plate = %entry.plate_number, "plate blacklisted");
        Ok(entry)
    }

    pub async fn list(&self, business_id: &str, page: u32, limit: u32) -> Result<Page<BlacklistEntry>> {
        let id = segment("business id", business_id)?;
        self.client
            .get(
                &format!("blacklist/business/{}", id),
                &page_query(page, limit),
            )
            .await
    }

    pub async fn search(&self, plate: &str) -> Result<Vec<BlacklistEntry>> {
        let plate = normalize_plate(plate)?;
        let reply: Value = self
            .client
            .get("blacklist/search", &[("plateNumber", plate)])
            .await?;
        unwrap_data(reply)
    }

    pub async fn check(&self, plate: &str) -> Result<BlacklistStatus> {
        let plate = normalize_plate(plate)?;
        self.client
            .get("blacklist/check", &[("plateNumber", plate)])
            .await
    }
}
