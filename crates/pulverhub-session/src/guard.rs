//! Startup session validation.
//!
//! Runs once before any other initialization: verifies that a token is
//! present and unexpired, renews it when it is about to expire, and
//! clears the session (forcing a new login) in every other case.

use std::sync::Arc;

use chrono::{Duration, Utc};

use pulverhub_core::AppResult;
use pulverhub_core::config::{api::ApiConfig, auth::AuthConfig};

use crate::refresh::request_refresh;
use crate::store::SessionStore;
use crate::token::decode_claims;

/// Validates the persisted session before the console starts.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    /// The persisted session store.
    store: Arc<SessionStore>,
    /// HTTP client for the refresh call.
    client: reqwest::Client,
    /// Server base URL.
    base_url: String,
    /// Renewal window.
    refresh_within: Duration,
}

impl SessionGuard {
    /// Creates a guard from configuration.
    pub fn new(
        store: Arc<SessionStore>,
        client: reqwest::Client,
        api: &ApiConfig,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            store,
            client,
            base_url: api.base_url.clone(),
            refresh_within: Duration::minutes(auth.refresh_within_minutes as i64),
        }
    }

    /// Checks the persisted session, renewing the token when needed.
    ///
    /// Returns `false` after clearing the session when the operator has
    /// to log in again; `true` when the console may start.
    pub async fn ensure_valid_session(&self) -> AppResult<bool> {
        let Some(session) = self.store.load().await? else {
            tracing::info!("No stored session, login required");
            return Ok(false);
        };

        let Some(claims) = decode_claims(&session.token) else {
            tracing::warn!("Stored token is undecodable, forcing logout");
            self.store.clear().await?;
            return Ok(false);
        };

        let now = Utc::now();

        if claims.is_expired(now) {
            tracing::info!("Stored token is expired, forcing logout");
            self.store.clear().await?;
            return Ok(false);
        }

        if claims.expires_within(now, self.refresh_within) {
            tracing::info!("Stored token expires soon, renewing");
            match request_refresh(&self.client, &self.base_url, &session.token).await {
                Ok(new_token) => {
                    self.store.set_token(&new_token).await?;
                    tracing::info!("Token renewed");
                }
                Err(e) => {
                    tracing::warn!("Token renewal failed, forcing logout: {e}");
                    self.store.clear().await?;
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }
}
