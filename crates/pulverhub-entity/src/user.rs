//! User entities: list rows, single-record details, and request payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A user row as returned by the user list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Assigned role id.
    #[serde(default)]
    pub role_id: Option<i64>,
    /// Resolved role name, joined in by the server.
    #[serde(default)]
    pub role_name: Option<String>,
    /// Whether the account may log in.
    pub active: bool,
    /// Soft-delete flag; deleted users stay restorable.
    #[serde(default)]
    pub deleted: bool,
    /// Whether the user must change the one-time password.
    #[serde(default)]
    pub must_change_password: Option<bool>,
    /// Last successful login time.
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    /// When the account was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A freshly fetched single user record.
///
/// This is the only user payload carrying the `updated_at` version
/// marker, which is why edit flows re-fetch instead of reusing list rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    /// Unique user identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Assigned role id.
    #[serde(default)]
    pub role_id: Option<i64>,
    /// Whether the account may log in.
    pub active: bool,
    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
    /// Last successful login time.
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    /// Opaque version marker, echoed on the next update.
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Payload for creating a new user. The server generates and returns a
/// one-time password.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUser {
    /// Desired login name.
    #[validate(length(min = 1, message = "Username ist ein Pflichtfeld"))]
    pub username: String,
    /// Email address.
    #[validate(email(message = "E-Mail-Adresse ist ungültig"))]
    pub email: String,
    /// Role to assign.
    pub role_id: Option<i64>,
    /// Whether the account starts active.
    pub active: bool,
}

/// Payload for updating an existing user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateUser {
    /// New login name.
    #[validate(length(min = 1, message = "Username ist ein Pflichtfeld"))]
    pub username: String,
    /// New email address.
    #[validate(email(message = "E-Mail-Adresse ist ungültig"))]
    pub email: String,
    /// New role id.
    pub role_id: Option<i64>,
    /// New active flag.
    pub active: bool,
    /// The last-read version marker of the record being updated.
    pub updated_at: String,
}

/// Server response after creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedUser {
    /// The created user record.
    pub user: CreatedUserInfo,
    /// The generated one-time password, shown to the operator once.
    pub temp_password: String,
}

/// The user fields the create endpoint echoes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedUserInfo {
    /// The new user's id.
    pub id: i64,
    /// The new user's login name.
    pub username: String,
    /// The new user's email address.
    #[serde(default)]
    pub email: Option<String>,
    /// The assigned role id.
    #[serde(default)]
    pub role_id: Option<i64>,
    /// Whether the account is active.
    pub active: bool,
}

/// Server response after a password reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordResult {
    /// The affected login name.
    pub username: String,
    /// The new one-time password.
    pub temp_password: String,
}
