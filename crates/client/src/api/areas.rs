//! Parking areas and their FTP camera sources.

use parkwatch_core::types::{FtpServer, NewArea, ParkingArea};
use serde_json::{json, Value};
use tracing::info;

use super::{required, segment, unwrap_data, Ack};
use crate::auth::AuthClient;
use crate::error::Result;

pub struct AreasApi<'a> {
    client: &'a AuthClient,
}

impl<'a> AreasApi<'a> {
    pub(crate) fn new(client: &'a AuthClient) -> Self {
        Self { client }
    }

    /// Areas of the caller's business.
    pub async fn list(&self) -> Result<Vec<ParkingArea>> {
        let reply: Value = self.client.get("parking/area", &[]).await?;
        unwrap_data(reply)
    }

    /// Create an area by name only.
    pub async fn create(&self, name: &str) -> Result<Ack> {
        let name = required("area name", name)?;
        let ack = self
            .client
            .post("parking/area", &json!({ "name": name }))
            .await?;
        info!(name, "parking area created");
        Ok(ack)
    }

    /// Create an area with capacity, location and policy.
    pub async fn input(&self, area: &NewArea) -> Result<Ack> {
        required("area name", &area.name)?;
        required("location", &area.location)?;
        let ack = self.client.post("parking/area/input-area", area).await?;
        info!(name = %area.name, capacity = area.capacity, "parking area defined");
        Ok(ack)
    }

    /// Attach an FTP server to an area.
    pub async fn save_ftp_server(&self, area_id: &str, ftp: &FtpServer) -> Result<Ack> {
        let id = segment("area id", area_id)?;
        self.client
            .post(&format!("parking/area/{}/input-ftpserver", id), ftp)
            .await
    }

    /// Test the FTP connection without saving it.
    pub async fn ftp_status(&self, area_id: &str, ftp: &FtpServer) -> Result<Value> {
        let id = segment("area id", area_id)?;
        self.client
            .post(&format!("parking/area/{}/status-ftpserver", id), ftp)
            .await
    }

    /// Ask the backend to pull new files from the area's FTP server now.
    pub async fn trigger_ftp(&self, area_id: &str) -> Result<Ack> {
        let id = segment("area id", area_id)?;
        self.client
            .post_empty(&format!("parking/area/{}/trigger-ftp", id))
            .await
    }

    /// Replace the FTP settings of an area.
    pub async fn update_ftp_server(&self, area_id: &str, ftp: &FtpServer) -> Result<Ack> {
        let id = segment("area id", area_id)?;
        self.client
            .put(&format!("parking-areas/{}/ftp", id), ftp)
            .await
    }
}
