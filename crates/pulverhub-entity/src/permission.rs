//! Permission entity.

use serde::{Deserialize, Serialize};

/// A named permission. The set of permissions is immutable from the
/// console's point of view and fetched once per module activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    /// Unique permission identifier.
    pub id: i64,
    /// Unique permission name, e.g. `user.delete`.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}
