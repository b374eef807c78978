//! REST API endpoint configuration.

use serde::{Deserialize, Serialize};

/// Settings for reaching the Pulverlager server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the server, e.g. `https://lager.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path prefix for server-rendered page fragments.
    #[serde(default = "default_content_path")]
    pub content_path: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            content_path: default_content_path(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_content_path() -> String {
    "/static/content".to_string()
}

fn default_timeout() -> u64 {
    30
}
