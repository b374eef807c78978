//! The token refresh call.
//!
//! `POST /api/refresh` authenticates with the current (possibly already
//! expired) token and returns a fresh one. Both the session guard and
//! the request gateway renew through this path.

use serde::Deserialize;

use pulverhub_core::{AppError, AppResult};

/// Response payload of the refresh endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

/// Requests a new access token using the current one as credential.
pub async fn request_refresh(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
) -> AppResult<String> {
    let url = format!("{}/api/refresh", base_url.trim_end_matches('/'));

    let response = client
        .post(&url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| AppError::network(format!("Refresh request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::authentication(format!(
            "Refresh rejected with status {}",
            response.status()
        )));
    }

    let body: RefreshResponse = response
        .json()
        .await
        .map_err(|e| AppError::serialization(format!("Invalid refresh response: {e}")))?;

    Ok(body.access_token)
}
