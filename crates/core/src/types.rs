//! Views of the documents the parking backend serves.
//!
//! The backend is loose about its response shapes, so most fields are
//! optional and unknown fields are ignored. Identifiers keep the backend's
//! `_id` naming on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ success, data, message }` wrapper most endpoints reply with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Pagination block. Field names differ per endpoint, hence the aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default, alias = "totalStaff", alias = "totalNotifications")]
    pub total: u64,
    #[serde(default, alias = "currentPage")]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total_pages: u32,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(
        default = "Vec::new",
        alias = "records",
        alias = "notifications",
        alias = "staff",
        alias = "vehicles"
    )]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
    /// Whether another page follows this one.
    pub fn has_next(&self) -> bool {
        self.pagination
            .as_ref()
            .map(|p| p.page < p.total_pages)
            .unwrap_or(false)
    }
}

/// Reply of the login, register and refresh endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub access_token: String,
}

/// Logged-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub business_id: Option<String>,
}

/// Account role offered at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Registration payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub business_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Staff member of a business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub business_id: Option<String>,
}

/// Staff creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaff {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
}

/// Staff update payload; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffUpdate {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
}

/// Profile fields the logged-in user may change about themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Reply of the staff mutation endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<Staff>,
}

/// Parking area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingArea {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub current_capacity: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub business_id: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub ftp_server: Option<Value>,
}

/// Full parking area definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArea {
    pub name: String,
    pub capacity: u32,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

/// FTP server an area pulls camera data from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpServer {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_folder: Option<String>,
}

/// A camera sighting / entry-exit record of a vehicle.
///
/// The record listings flatten sightings into `plate` / `action` / `time` /
/// `date`; the vehicle listing keeps the stored document. Both land here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "plate")]
    pub plate_number: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub entry_time: Option<String>,
    #[serde(default)]
    pub leaving_time: Option<String>,
    #[serde(default)]
    pub current_duration: Option<Value>,
    #[serde(default)]
    pub image: Option<String>,
}

impl VehicleRecord {
    /// Human-readable timestamp, whichever form the listing used.
    pub fn when(&self) -> String {
        match (&self.date, &self.time) {
            (Some(date), Some(time)) => format!("{} {}", date, time),
            _ => self
                .datetime
                .clone()
                .or_else(|| self.entry_time.clone())
                .unwrap_or_default(),
        }
    }
}

/// Saved report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub chart_data: Option<Value>,
    #[serde(default)]
    pub filters: Option<Value>,
    #[serde(default)]
    pub is_shared: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Report creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub name: String,
    pub area_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub chart_data: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_image: Option<String>,
    pub filters: Value,
    pub description: String,
}

/// Short user view embedded in comments and shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserRef {
    /// "First Last", falling back to the username.
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// Comment on a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub report_id: String,
    pub author_id: UserRef,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A report shared with one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportShare {
    #[serde(rename = "_id")]
    pub id: String,
    pub report_id: String,
    #[serde(default)]
    pub shared_by: Option<String>,
    pub shared_with: UserRef,
    #[serde(default)]
    pub business_id: Option<String>,
    #[serde(default)]
    pub permissions: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Capacity or system notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_read: Option<bool>,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub current_capacity: Option<u32>,
    #[serde(default)]
    pub total_capacity: Option<u32>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Notification {
    /// Read state; the backend reports it either as a flag or as a status string.
    pub fn is_read(&self) -> bool {
        self.is_read
            .unwrap_or_else(|| self.status.as_deref() == Some("read"))
    }
}

/// Notification listing reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub unread_count: u64,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Blacklisted plate of a business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub business_id: String,
    pub plate_number: String,
    pub reason: String,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Canned question of the QA catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaItem {
    pub keyword: String,
    pub question: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_accepts_endpoint_specific_keys() {
        let records: Page<VehicleRecord> = serde_json::from_value(json!({
            "success": true,
            "records": [{ "_id": "r1", "plateNumber": "ABC123", "areaId": "a1" }],
            "pagination": { "total": 31, "page": 2, "limit": 10, "totalPages": 4 }
        }))
        .unwrap();
        assert_eq!(records.data.len(), 1);
        assert_eq!(records.data[0].plate_number, "ABC123");
        assert!(records.has_next());

        let staff: Page<Staff> = serde_json::from_value(json!({
            "message": "ok",
            "staff": [],
            "pagination": { "currentPage": 3, "totalPages": 3, "totalStaff": 21, "limit": 10 }
        }))
        .unwrap();
        let pagination = staff.pagination.clone().unwrap();
        assert_eq!(pagination.page, 3);
        assert_eq!(pagination.total, 21);
        assert!(!staff.has_next());
    }

    #[test]
    fn flattened_sighting_reads_as_record() {
        let record: VehicleRecord = serde_json::from_value(json!({
            "plate": "51A12345",
            "action": "ENTRY",
            "time": "08:15:02",
            "date": "03/14/2025"
        }))
        .unwrap();
        assert_eq!(record.plate_number, "51A12345");
        assert!(record.id.is_none());
        assert_eq!(record.when(), "03/14/2025 08:15:02");

        let vehicles: Page<VehicleRecord> = serde_json::from_value(json!({
            "success": true,
            "vehicles": [{ "_id": "v1", "plateNumber": "30F99999", "datetime": "2025-03-14T08:00:00Z" }],
            "pagination": { "total": 1, "page": 1, "limit": 10, "totalPages": 1 }
        }))
        .unwrap();
        assert_eq!(vehicles.data[0].when(), "2025-03-14T08:00:00Z");
    }

    #[test]
    fn notification_read_state_from_status() {
        let n: Notification = serde_json::from_value(json!({
            "_id": "n1",
            "message": "Area A at 92% capacity",
            "type": "capacity_critical",
            "status": "read"
        }))
        .unwrap();
        assert!(n.is_read());
        assert_eq!(n.kind.as_deref(), Some("capacity_critical"));
    }

    #[test]
    fn registration_omits_missing_role() {
        let payload = serde_json::to_value(Registration {
            username: "kim".into(),
            email: "kim@example.com".into(),
            password: "pw".into(),
            business_id: "b1".into(),
            role: None,
        })
        .unwrap();
        assert_eq!(payload.get("businessId"), Some(&json!("b1")));
        assert!(payload.get("role").is_none());
    }

    #[test]
    fn user_ref_display_name_falls_back_to_username() {
        let named = UserRef {
            id: "u1".into(),
            username: "jdoe".into(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: None,
        };
        assert_eq!(named.display_name(), "Jane Doe");

        let bare = UserRef {
            first_name: None,
            last_name: Some(String::new()),
            ..named
        };
        assert_eq!(bare.display_name(), "jdoe");
    }
}
