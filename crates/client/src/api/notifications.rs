//! Capacity and system notifications.

use parkwatch_core::types::NotificationList;
use serde::Deserialize;
use serde_json::Value;

use super::{segment, Ack};
use crate::auth::AuthClient;
use crate::error::Result;

/// Listing filters; only the fields that are set reach the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFilters {
    pub is_read: Option<bool>,
    pub kind: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl NotificationFilters {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(is_read) = self.is_read {
            query.push(("isRead", is_read.to_string()));
        }
        let text = [
            ("type", &self.kind),
            ("userId", &self.user_id),
            ("startDate", &self.start_date),
            ("endDate", &self.end_date),
        ];
        for (key, value) in text {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                query.push((key, value.to_string()));
            }
        }
        // Zero means "server default", as in the dashboard.
        if let Some(page) = self.page.filter(|p| *p > 0) {
            query.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnreadCount {
    #[serde(default)]
    unread_count: u64,
}

pub struct NotificationsApi<'a> {
    client: &'a AuthClient,
}

impl<'a> NotificationsApi<'a> {
    pub(crate) fn new(client: &'a AuthClient) -> Self {
        Self { client }
    }

    /// The ten most recent notifications of the business.
    pub async fn recent(&self) -> Result<NotificationList> {
        self.client
            .get("notification/getRecentNotifications", &[])
            .await
    }

    pub async fn all(&self, filters: &NotificationFilters) -> Result<NotificationList> {
        self.client
            .get("notification/getAllNotifications", &filters.to_query())
            .await
    }

    pub async fn unread_count(&self) -> Result<u64> {
        let reply: UnreadCount = self.client.get("notification/unread-count", &[]).await?;
        Ok(reply.unread_count)
    }

    pub async fn mark_read(&self, notification_id: &str) -> Result<Value> {
        let id = segment("notification id", notification_id)?;
        self.client
            .put_empty(&format!("notifications/{}/read", id))
            .await
    }

    pub async fn mark_all_read(&self) -> Result<Ack> {
        self.client.put_empty("notification/read-all").await
    }

    pub async fn delete(&self, notification_id: &str) -> Result<Ack> {
        let id = segment("notification id", notification_id)?;
        self.client
            .delete(&format!("notifications/{}", id), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_set_filters_are_sent() {
        assert!(NotificationFilters::default().to_query().is_empty());

        let filters = NotificationFilters {
            is_read: Some(false),
            kind: Some("warning".to_string()),
            user_id: Some(String::new()),
            page: Some(2),
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(
            filters.to_query(),
            vec![
                ("isRead", "false".to_string()),
                ("type", "warning".to_string()),
                ("page", "2".to_string()),
            ]
        );
    }
}
