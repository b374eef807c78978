//! The authenticated request gateway.
//!
//! Every API call goes through [`ApiGateway::request`]:
//!
//! 1. The stored token is read; without one the session is cleared and
//!    the call fails with a `Session` error.
//! 2. If the token's `exp` claim is within the renewal window, a
//!    refresh is attempted first. A failed refresh only logs a warning;
//!    the request proceeds with the old token.
//! 3. The request carries `Content-Type: application/json` and the
//!    bearer header; caller-supplied headers win on conflict.
//! 4. A 401 response clears the session, notifies the operator, and
//!    fails with a `Session` error instead of returning a response.
//!
//! Other statuses are handed back to the caller; network failures
//! propagate without retry.

use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;

use pulverhub_core::config::{api::ApiConfig, auth::AuthConfig};
use pulverhub_core::traits::Notifier;
use pulverhub_core::{AppError, AppResult};
use pulverhub_session::refresh::request_refresh;
use pulverhub_session::store::SessionStore;
use pulverhub_session::token;

/// Authenticated HTTP gateway to the Pulverlager server.
#[derive(Clone)]
pub struct ApiGateway {
    /// Shared HTTP client.
    client: reqwest::Client,
    /// Server base URL without trailing slash.
    base_url: String,
    /// Proactive renewal window.
    refresh_within: Duration,
    /// Persisted session store; rewritten on refresh, cleared on 401.
    store: Arc<SessionStore>,
    /// Operator notification seam for the forced-logout alert.
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for ApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGateway")
            .field("base_url", &self.base_url)
            .field("refresh_within", &self.refresh_within)
            .finish()
    }
}

impl ApiGateway {
    /// Creates a gateway from configuration.
    pub fn new(
        api: &ApiConfig,
        auth: &AuthConfig,
        store: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(api.timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            refresh_within: Duration::minutes(auth.refresh_within_minutes as i64),
            store,
            notifier,
        })
    }

    /// The server base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds an absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issues an authenticated request with default headers.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> AppResult<Response> {
        self.request_with_headers(method, path, body, HeaderMap::new())
            .await
    }

    /// Issues an authenticated request, merging `extra_headers` over the
    /// defaults (caller headers win on conflict).
    pub async fn request_with_headers(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        extra_headers: HeaderMap,
    ) -> AppResult<Response> {
        let Some(mut bearer) = self.store.token().await? else {
            tracing::warn!("No stored token, forcing logout");
            self.store.clear().await?;
            return Err(AppError::session("Not logged in"));
        };

        if token::expires_within(&bearer, Utc::now(), self.refresh_within) {
            tracing::info!("Token expires soon, renewing before request");
            match request_refresh(&self.client, &self.base_url, &bearer).await {
                Ok(new_token) => {
                    self.store.set_token(&new_token).await?;
                    bearer = new_token;
                }
                Err(e) => {
                    // Proceed with the old token; the server will answer
                    // 401 if it is no longer acceptable.
                    tracing::warn!("Token renewal failed: {e}");
                }
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer_value = HeaderValue::from_str(&format!("Bearer {bearer}"))
            .map_err(|e| AppError::internal(format!("Invalid token header: {e}")))?;
        headers.insert(AUTHORIZATION, bearer_value);
        for (name, value) in extra_headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let mut builder = self.client.request(method, self.url(path)).headers(headers);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::network(format!("Request failed: {e}")))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.notifier
                .alert("Sitzung abgelaufen, bitte erneut anmelden.");
            self.store.clear().await?;
            return Err(AppError::session("Session expired"));
        }

        Ok(response)
    }

    /// GET helper decoding a successful JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self.request(Method::GET, path, None).await?;
        Self::decode_json(response).await
    }

    /// Decodes a response, mapping conflict and error statuses.
    pub async fn decode_json<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::serialization(format!("Invalid response body: {e}")))
    }

    /// Maps non-success statuses to typed errors, extracting the
    /// server-supplied `detail` text.
    pub async fn check_status(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut detail = Self::error_detail(response).await;
        if detail.is_empty() {
            detail = status.to_string();
        }
        tracing::debug!("Request rejected with {status}: {detail}");
        match status {
            StatusCode::CONFLICT => Err(AppError::conflict(detail)),
            StatusCode::NOT_FOUND => Err(AppError::not_found(detail)),
            StatusCode::FORBIDDEN => Err(AppError::authorization(detail)),
            _ => Err(AppError::api(detail)),
        }
    }

    /// Extracts the `detail` field of an error payload, falling back to
    /// the raw body.
    async fn error_detail(response: Response) -> String {
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => value
                .get("detail")
                .and_then(|detail| detail.as_str())
                .map(str::to_string)
                .unwrap_or(text),
            Err(_) => text,
        }
    }
}
