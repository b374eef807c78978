//! The persisted client session.

use serde::{Deserialize, Serialize};

/// The two values the console persists between runs: the bearer token
/// and the logged-in username. Cleared entirely on logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    /// The signed, time-limited bearer token (opaque to the client
    /// except for its expiry claim).
    pub token: String,
    /// The logged-in username, shown in the console header.
    pub username: String,
}
