//! Real-time channel configuration.

use serde::{Deserialize, Serialize};

/// Settings for the shared WebSocket event channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Server-side endpoint path of the application channel.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Fixed delay before a reconnect attempt, in seconds.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_seconds: u64,
    /// Broadcast buffer size for slow local subscribers.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            reconnect_delay_seconds: default_reconnect_delay(),
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_endpoint() -> String {
    "/ws/app".to_string()
}

fn default_reconnect_delay() -> u64 {
    2
}

fn default_buffer_size() -> usize {
    64
}
