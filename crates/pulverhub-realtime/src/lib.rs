//! # pulverhub-realtime
//!
//! The console's single realtime event channel: one long-lived
//! WebSocket connection to the server's `/ws/app` endpoint, republished
//! locally as a broadcast bus of parsed [`AppEvent`]s.
//!
//! [`AppEvent`]: pulverhub_core::events::AppEvent

pub mod channel;

pub use channel::EventChannel;
