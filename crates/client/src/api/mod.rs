//! Typed calls for the backend resources.
//!
//! Each resource is a thin borrow of the [`AuthClient`], so every call shares
//! its session and refresh slot:
//!
//! ```no_run
//! # async fn demo(client: parkwatch_client::AuthClient) -> parkwatch_client::Result<()> {
//! let areas = client.areas().list().await?;
//! let page = client.vehicles().all_records(&areas[0].id, 1, 10).await?;
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod areas;
pub mod blacklist;
pub mod comments;
pub mod investigate;
pub mod notifications;
pub mod qa;
pub mod reports;
pub mod shares;
pub mod staff;
pub mod vehicles;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::AuthClient;
use crate::error::{ClientError, Result};

pub use account::AccountApi;
pub use areas::AreasApi;
pub use blacklist::{normalize_plate, BlacklistApi, BlacklistStatus};
pub use comments::CommentsApi;
pub use investigate::{InvestigateApi, InvestigateResult};
pub use notifications::{NotificationFilters, NotificationsApi};
pub use qa::QaApi;
pub use reports::ReportsApi;
pub use shares::SharesApi;
pub use staff::StaffApi;
pub use vehicles::VehiclesApi;

/// Generic reply of mutation endpoints: a message plus whatever else the
/// backend put in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl AuthClient {
    pub fn account(&self) -> AccountApi<'_> {
        AccountApi::new(self)
    }

    pub fn areas(&self) -> AreasApi<'_> {
        AreasApi::new(self)
    }

    pub fn vehicles(&self) -> VehiclesApi<'_> {
        VehiclesApi::new(self)
    }

    pub fn staff(&self) -> StaffApi<'_> {
        StaffApi::new(self)
    }

    pub fn reports(&self) -> ReportsApi<'_> {
        ReportsApi::new(self)
    }

    pub fn comments(&self) -> CommentsApi<'_> {
        CommentsApi::new(self)
    }

    pub fn shares(&self) -> SharesApi<'_> {
        SharesApi::new(self)
    }

    pub fn notifications(&self) -> NotificationsApi<'_> {
        NotificationsApi::new(self)
    }

    pub fn blacklist(&self) -> BlacklistApi<'_> {
        BlacklistApi::new(self)
    }

    pub fn qa(&self) -> QaApi<'_> {
        QaApi::new(self)
    }

    pub fn investigate(&self) -> InvestigateApi<'_> {
        InvestigateApi::new(self)
    }
}

/// Payload of a reply that is either bare or wrapped as
/// `{ success, data, message }`.
pub(crate) fn unwrap_data<T: DeserializeOwned>(reply: Value) -> Result<T> {
    unwrap_key(reply, "data")
}

/// Payload under `key` when the reply wraps it there (or under `data`),
/// otherwise the reply itself.
pub(crate) fn unwrap_key<T: DeserializeOwned>(reply: Value, key: &str) -> Result<T> {
    let payload = match reply {
        Value::Object(mut map) if map.get(key).is_some_and(|v| !v.is_null()) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        Value::Object(mut map)
            if map.contains_key("success") && map.get("data").is_some_and(|v| !v.is_null()) =>
        {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(payload).map_err(|e| ClientError::Decode(e.to_string()))
}

/// `page` / `limit` query pair.
pub(crate) fn page_query(page: u32, limit: u32) -> Vec<(&'static str, String)> {
    vec![("page", page.max(1).to_string()), ("limit", limit.max(1).to_string())]
}

/// Validate an identifier before splicing it into a path.
pub(crate) fn segment<'a>(name: &str, id: &'a str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ClientError::Argument(format!("{} must not be empty", name)));
    }
    if id == "." || id == ".." {
        return Err(ClientError::Argument(format!(
            "{} must not be a dot segment: {:?}",
            name, id
        )));
    }
    if id.contains(['/', '?', '#']) {
        return Err(ClientError::Argument(format!(
            "{} contains a reserved character: {:?}",
            name, id
        )));
    }
    Ok(id)
}

/// Reject blank required text.
pub(crate) fn required<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(ClientError::Argument(format!("{} is required", name)))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwrap_accepts_bare_and_wrapped() {
        let bare: Vec<String> = unwrap_data(json!(["a", "b"])).unwrap();
        assert_eq!(bare, vec!["a", "b"]);

        let wrapped: Vec<String> =
            unwrap_data(json!({ "success": true, "data": ["c"], "message": "ok" })).unwrap();
        assert_eq!(wrapped, vec!["c"]);

        let user: Value = unwrap_key(json!({ "user": { "_id": "u1" } }), "user").unwrap();
        assert_eq!(user, json!({ "_id": "u1" }));
    }

    #[test]
    fn segment_rejects_path_injection() {
        assert_eq!(segment("area id", " a1 ").unwrap(), "a1");
        assert!(matches!(segment("area id", ""), Err(ClientError::Argument(_))));
        assert!(matches!(
            segment("area id", "../admin"),
            Err(ClientError::Argument(_))
        ));
        assert!(matches!(segment("area id", ".."), Err(ClientError::Argument(_))));
        assert!(matches!(segment("area id", " . "), Err(ClientError::Argument(_))));
        assert_eq!(segment("area id", "lot.a").unwrap(), "lot.a");
    }

    #[test]
    fn ack_keeps_extra_fields() {
        let ack: Ack =
            serde_json::from_value(json!({ "message": "Created", "areaId": "a9" })).unwrap();
        assert_eq!(ack.message.as_deref(), Some("Created"));
        assert_eq!(ack.rest.get("areaId"), Some(&json!("a9")));
    }
}
