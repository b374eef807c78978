//! Inventory endpoints.

use std::sync::Arc;

use reqwest::Method;

use pulverhub_core::AppResult;
use pulverhub_entity::{
    CreatePulver, CreatedPulver, Pulver, PulverBestand, PulverDetail, TrackMovement, TrackResult,
    UpdatePulver,
};

use crate::client::ApiGateway;

/// Client for `/api/pulver/...`.
#[derive(Debug, Clone)]
pub struct PulverApi {
    /// The authenticated gateway.
    gateway: Arc<ApiGateway>,
}

impl PulverApi {
    /// Creates an inventory client.
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    /// Lists all non-deleted inventory items.
    pub async fn list(&self) -> AppResult<Vec<Pulver>> {
        self.gateway.get_json("/api/pulver/").await
    }

    /// Fetches one item fresh by id, including the `updated_at` marker.
    pub async fn get(&self, pulver_id: i64) -> AppResult<PulverDetail> {
        self.gateway
            .get_json(&format!("/api/pulver/id/{pulver_id}"))
            .await
    }

    /// Looks up a carton's current stock by barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> AppResult<PulverBestand> {
        self.gateway
            .get_json(&format!("/api/pulver/{barcode}"))
            .await
    }

    /// Creates an item; the server generates and returns the barcode.
    pub async fn create(&self, payload: &CreatePulver) -> AppResult<CreatedPulver> {
        let body = serde_json::to_value(payload)?;
        let response = self
            .gateway
            .request(Method::POST, "/api/pulver/", Some(&body))
            .await?;
        ApiGateway::decode_json(response).await
    }

    /// Updates an item, echoing the last-read `updated_at`. A stale
    /// marker yields a `Conflict` error.
    pub async fn update(&self, pulver_id: i64, payload: &UpdatePulver) -> AppResult<()> {
        let body = serde_json::to_value(payload)?;
        let response = self
            .gateway
            .request(Method::PUT, &format!("/api/pulver/{pulver_id}"), Some(&body))
            .await?;
        ApiGateway::check_status(response).await?;
        Ok(())
    }

    /// Soft-deletes an item.
    pub async fn delete(&self, pulver_id: i64) -> AppResult<()> {
        let response = self
            .gateway
            .request(Method::DELETE, &format!("/api/pulver/{pulver_id}"), None)
            .await?;
        ApiGateway::check_status(response).await?;
        Ok(())
    }

    /// Books a quantity movement against a carton.
    pub async fn track(&self, payload: &TrackMovement) -> AppResult<TrackResult> {
        let body = serde_json::to_value(payload)?;
        let response = self
            .gateway
            .request(Method::POST, "/api/pulver/track", Some(&body))
            .await?;
        ApiGateway::decode_json(response).await
    }

    /// The printable label URL for an item, opened externally.
    pub fn label_url(&self, pulver_id: i64) -> String {
        self.gateway.url(&format!("/api/pulver/{pulver_id}/label"))
    }
}
