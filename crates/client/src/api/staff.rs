//! Staff accounts of a business.

use parkwatch_core::types::{NewStaff, Page, Staff, StaffMessage, StaffUpdate};
use tracing::info;

use super::{page_query, required, Ack};
use crate::auth::AuthClient;
use crate::error::Result;

pub struct StaffApi<'a> {
    client: &'a AuthClient,
}

impl<'a> StaffApi<'a> {
    pub(crate) fn new(client: &'a AuthClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, business_id: &str, page: u32, limit: u32) -> Result<Page<Staff>> {
        let business_id = required("business id", business_id)?;
        let mut query = vec![("businessId", business_id.to_string())];
        query.extend(page_query(page, limit));
        self.client.get("staff/list-staff", &query).await
    }

    pub async fn create(&self, staff: &NewStaff) -> Result<Ack> {
        required("username", &staff.username)?;
        required("password", &staff.password)?;
        required("email", &staff.email)?;
        let ack = self.client.post("staff/create-staff", staff).await?;
        info!(username = %staff.username, "staff account created");
        Ok(ack)
    }

    /// Update the fields set on `update`; `user_id` selects the account.
    pub async fn update(&self, update: &StaffUpdate) -> Result<StaffMessage> {
        required("user id", &update.user_id)?;
        self.client.put("staff/update-staff", update).await
    }

    pub async fn delete(&self, user_id: &str) -> Result<Ack> {
        let user_id = required("user id", user_id)?;
        let ack = self
            .client
            .delete("staff/delete-staff", &[("userId", user_id.to_string())])
            .await?;
        info!(user_id, "staff account deleted");
        Ok(ack)
    }
}
