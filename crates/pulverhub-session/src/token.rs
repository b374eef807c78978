//! Bearer token payload decoding.
//!
//! The token is a three-part signed structure. The client never
//! verifies the signature (it has no key and the server re-validates
//! every request); it only base64-decodes the middle part to read the
//! `exp` claim and decide whether a proactive refresh is due.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// The claims the client cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject, the login name.
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiration timestamp (seconds since epoch).
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Returns the expiration as a `DateTime<Utc>`, if present.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Checks whether the token is already expired at `now`.
    ///
    /// A token without an `exp` claim never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    /// Checks whether the token expires within `window` of `now`.
    ///
    /// Already-expired tokens count as expiring.
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.expires_at() {
            Some(expires_at) => expires_at - now < window,
            None => false,
        }
    }
}

/// Decodes the claims from a token's middle segment.
///
/// Returns `None` when the token does not have three parts, the payload
/// is not valid base64, or the decoded bytes are not a JSON object.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut parts = token.split('.');
    let _header = parts.next()?;
    let payload = parts.next()?;
    let _signature = parts.next()?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD.decode(payload))
        .ok()?;

    serde_json::from_slice(&bytes).ok()
}

/// Whether a raw token string expires within `window` of `now`.
///
/// Undecodable tokens are treated as **not** expiring: the gateway
/// fails open here and leaves strict validation to the session guard
/// and the server.
pub fn expires_within(token: &str, now: DateTime<Utc>, window: Duration) -> bool {
    match decode_claims(token) {
        Some(claims) => claims.expires_within(now, window),
        None => false,
    }
}
