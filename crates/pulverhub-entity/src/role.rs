//! Role entities and permission assignment payloads.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A role as returned by the role list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique role identifier.
    pub id: i64,
    /// Unique role name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// The permission assignment set of one role, fetched per role.
///
/// Carries the role's `updated_at` version marker, which must be echoed
/// on the next assignment write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermissions {
    /// The role's id.
    pub role_id: i64,
    /// The role's name.
    pub role_name: String,
    /// Ids of the permissions currently assigned to the role.
    pub permissions: Vec<i64>,
    /// Opaque version marker of the role record.
    pub updated_at: String,
}

/// Payload for creating a new role.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRole {
    /// The new role's name.
    #[validate(length(min = 1, message = "Rollenname ist ein Pflichtfeld"))]
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Payload replacing a role's permission assignment set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignPermissions {
    /// The target role.
    pub role_id: i64,
    /// The full set of permission ids the role should have.
    pub permission_ids: Vec<i64>,
    /// The last-read version marker of the role.
    pub updated_at: String,
}

/// Server response after a successful assignment write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentResult {
    /// The affected role.
    pub role_id: i64,
    /// The new version marker to use for subsequent writes.
    pub updated_at: String,
    /// The permission ids the server accepted.
    #[serde(default)]
    pub assigned_permissions: Vec<i64>,
}
