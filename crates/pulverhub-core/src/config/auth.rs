//! Token refresh configuration.

use serde::{Deserialize, Serialize};

/// Authentication and token renewal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Tokens expiring within this many minutes are proactively renewed.
    #[serde(default = "default_refresh_within")]
    pub refresh_within_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_within_minutes: default_refresh_within(),
        }
    }
}

fn default_refresh_within() -> u64 {
    10
}
