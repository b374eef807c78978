//! The current operator's profile as returned by `/api/me`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The authenticated user's identity and effective permission set.
///
/// Fetched lazily on the first permission check and then cached for the
/// lifetime of the process; a permission revoked server-side therefore
/// only takes effect in the UI after a restart. The server re-checks
/// every request regardless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// The operator's user id.
    pub id: i64,
    /// The operator's login name.
    pub username: String,
    /// The operator's role id.
    #[serde(default)]
    pub role_id: Option<i64>,
    /// Names of all permissions granted through the role.
    pub permissions: HashSet<String>,
    /// Whether the one-time password must still be changed.
    #[serde(default)]
    pub must_change_password: bool,
    /// Whether the account is active.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CurrentUser {
    /// Checks whether the operator holds the named permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}
