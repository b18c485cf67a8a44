//! The logged-in user's own profile.

use parkwatch_core::types::ProfileUpdate;
use tracing::info;

use super::{required, Ack};
use crate::auth::AuthClient;
use crate::error::Result;

pub struct AccountApi<'a> {
    client: &'a AuthClient,
}

impl<'a> AccountApi<'a> {
    pub(crate) fn new(client: &'a AuthClient) -> Self {
        Self { client }
    }

    /// Update name and contact details. First and last name are required;
    /// optional fields left unset are not sent.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Ack> {
        let mut update = update.clone();
        update.first_name = required("first name", &update.first_name)?.to_string();
        update.last_name = required("last name", &update.last_name)?.to_string();
        let ack = self.client.put("account/update-name", &update).await?;
        info!("profile updated");
        Ok(ack)
    }
}
