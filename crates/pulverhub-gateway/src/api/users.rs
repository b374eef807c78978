//! User administration endpoints.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::Method;

use pulverhub_core::AppResult;
use pulverhub_entity::{CreateUser, CreatedUser, ResetPasswordResult, UpdateUser, User, UserDetail};

use crate::client::ApiGateway;

/// Client for `/api/users/...`.
#[derive(Debug, Clone)]
pub struct UsersApi {
    /// The authenticated gateway.
    gateway: Arc<ApiGateway>,
}

impl UsersApi {
    /// Creates a users client.
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    /// Lists users; with `show_deleted` the soft-deleted ones are
    /// included.
    pub async fn list(&self, show_deleted: bool) -> AppResult<Vec<User>> {
        let path = if show_deleted {
            "/api/users/?show_deleted=true"
        } else {
            "/api/users/"
        };
        self.gateway.get_json(path).await
    }

    /// Fetches one user fresh, including the `updated_at` marker.
    pub async fn get(&self, user_id: i64) -> AppResult<UserDetail> {
        self.gateway.get_json(&format!("/api/users/{user_id}")).await
    }

    /// Creates a user; the response carries the generated one-time
    /// password.
    pub async fn create(&self, payload: &CreateUser) -> AppResult<CreatedUser> {
        let body = serde_json::to_value(payload)?;
        let response = self
            .gateway
            .request(Method::POST, "/api/users/", Some(&body))
            .await?;
        ApiGateway::decode_json(response).await
    }

    /// Updates a user, echoing the last-read `updated_at`. A stale
    /// marker yields a `Conflict` error.
    pub async fn update(&self, user_id: i64, payload: &UpdateUser) -> AppResult<()> {
        let body = serde_json::to_value(payload)?;
        let response = self
            .gateway
            .request(Method::PUT, &format!("/api/users/{user_id}"), Some(&body))
            .await?;
        ApiGateway::check_status(response).await?;
        Ok(())
    }

    /// Soft-deletes a user.
    pub async fn delete(&self, user_id: i64) -> AppResult<()> {
        let response = self
            .gateway
            .request(Method::DELETE, &format!("/api/users/{user_id}"), None)
            .await?;
        ApiGateway::check_status(response).await?;
        Ok(())
    }

    /// Restores a soft-deleted user.
    pub async fn restore(&self, user_id: i64) -> AppResult<()> {
        let response = self
            .gateway
            .request(Method::PUT, &format!("/api/users/restore/{user_id}"), None)
            .await?;
        ApiGateway::check_status(response).await?;
        Ok(())
    }

    /// Assigns a new one-time password.
    pub async fn reset_password(&self, user_id: i64) -> AppResult<ResetPasswordResult> {
        let response = self
            .gateway
            .request(
                Method::POST,
                &format!("/api/users/{user_id}/reset_password"),
                None,
            )
            .await?;
        ApiGateway::decode_json(response).await
    }

    /// Downloads the user list as a binary spreadsheet blob.
    pub async fn export(&self) -> AppResult<Bytes> {
        let response = self
            .gateway
            .request(Method::GET, "/api/users/export", None)
            .await?;
        let response = ApiGateway::check_status(response).await?;
        response
            .bytes()
            .await
            .map_err(|e| pulverhub_core::AppError::network(format!("Export download failed: {e}")))
    }
}
