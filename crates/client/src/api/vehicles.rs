//! Vehicles currently parked and the sighting history of an area.

use parkwatch_core::types::{Page, VehicleRecord};
use serde_json::Value;

use super::{page_query, segment, unwrap_data};
use crate::auth::AuthClient;
use crate::error::Result;

pub struct VehiclesApi<'a> {
    client: &'a AuthClient,
}

impl<'a> VehiclesApi<'a> {
    pub(crate) fn new(client: &'a AuthClient) -> Self {
        Self { client }
    }

    /// Last few entry / exit sightings of an area.
    pub async fn recent_records(&self, area_id: &str) -> Result<Vec<VehicleRecord>> {
        let id = segment("area id", area_id)?;
        let reply: Value = self
            .client
            .get(&format!("parking/vehicle/{}/recent-records", id), &[])
            .await?;
        unwrap_data(reply)
    }

    /// Vehicles inside the area right now.
    pub async fn existing(&self, area_id: &str, page: u32, limit: u32) -> Result<Page<VehicleRecord>> {
        let id = segment("area id", area_id)?;
        self.client
            .get(
                &format!("parking/vehicle/{}/existing-vehicles", id),
                &page_query(page, limit),
            )
            .await
    }

    /// Full sighting history of the area.
    pub async fn all_records(&self, area_id: &str, page: u32, limit: u32) -> Result<Page<VehicleRecord>> {
        let id = segment("area id", area_id)?;
        self.client
            .get(
                &format!("parking/vehicle/{}/all-records", id),
                &page_query(page, limit),
            )
            .await
    }
}
