//! Persisted session configuration.

use serde::{Deserialize, Serialize};

/// Where the bearer token and username are persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path of the session file.
    #[serde(default = "default_file")]
    pub file: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: default_file(),
        }
    }
}

fn default_file() -> String {
    "data/session.json".to_string()
}
