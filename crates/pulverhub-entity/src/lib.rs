//! # pulverhub-entity
//!
//! Wire-format entity models for the Pulverlager REST API. Every struct
//! in this crate mirrors a JSON payload the server produces or accepts.
//! All entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`;
//! request payloads additionally derive `validator::Validate`.
//!
//! Version markers (`updated_at`) are kept as **opaque strings**: the
//! client only ever echoes the last-read value back to the server, which
//! is the sole authority for conflict detection.

pub mod permission;
pub mod profile;
pub mod pulver;
pub mod role;
pub mod session;
pub mod user;

pub use permission::Permission;
pub use profile::CurrentUser;
pub use pulver::{
    CreatePulver, CreatedPulver, Pulver, PulverBestand, PulverDetail, TrackMovement, TrackResult,
    UpdatePulver,
};
pub use role::{AssignPermissions, AssignmentResult, CreateRole, Role, RolePermissions};
pub use session::StoredSession;
pub use user::{CreateUser, CreatedUser, ResetPasswordResult, UpdateUser, User, UserDetail};

use pulverhub_core::{AppError, AppResult};
use validator::Validate;

/// Validates a request payload before it is sent to the server.
///
/// Collapses `validator`'s per-field error map into a single
/// `Validation` error with a readable message.
pub fn validate_payload<T: Validate>(payload: &T) -> AppResult<()> {
    payload.validate().map_err(|errors| {
        let mut parts: Vec<String> = Vec::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                match &error.message {
                    Some(message) => parts.push(format!("{field}: {message}")),
                    None => parts.push(format!("{field}: invalid value ({})", error.code)),
                }
            }
        }
        parts.sort();
        AppError::validation(parts.join("; "))
    })
}
