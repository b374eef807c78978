//! The shared realtime event channel.
//!
//! Exactly one physical connection exists per process. Inbound frames
//! are parsed as JSON events and republished on a `broadcast` bus, so
//! any number of page modules can listen without blocking each other.
//! A malformed frame is logged and dropped; the channel itself never
//! dies from bad input. Connection loss schedules a reconnect after a
//! fixed delay, forever, until [`EventChannel::shutdown`] cancels the
//! loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use pulverhub_core::config::realtime::RealtimeConfig;
use pulverhub_core::events::AppEvent;
use pulverhub_core::{AppError, AppResult};

/// The process-wide realtime channel.
#[derive(Debug)]
pub struct EventChannel {
    /// Derived `ws://` / `wss://` endpoint URL.
    url: String,
    /// Fixed delay between reconnect attempts.
    reconnect_delay: Duration,
    /// Local event bus.
    events: broadcast::Sender<AppEvent>,
    /// Stop signal for the connection loop.
    cancel: CancellationToken,
    /// Guard so only one connection loop is ever spawned.
    started: AtomicBool,
}

impl EventChannel {
    /// Creates the channel for the given server base URL.
    ///
    /// The transport mirrors the API transport: `https` becomes `wss`,
    /// `http` becomes `ws`.
    pub fn new(base_url: &str, config: &RealtimeConfig) -> AppResult<Self> {
        let url = Self::channel_url(base_url, &config.endpoint)?;
        let (events, _) = broadcast::channel(config.buffer_size);

        Ok(Self {
            url,
            reconnect_delay: Duration::from_secs(config.reconnect_delay_seconds),
            events,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
        })
    }

    /// Derives the WebSocket URL from the HTTP base URL.
    fn channel_url(base_url: &str, endpoint: &str) -> AppResult<String> {
        let base = base_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            Ok(format!("wss://{rest}{endpoint}"))
        } else if let Some(rest) = base.strip_prefix("http://") {
            Ok(format!("ws://{rest}{endpoint}"))
        } else {
            Err(AppError::configuration(format!(
                "Base URL must be http(s): {base_url}"
            )))
        }
    }

    /// The derived channel URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Subscribes to the local event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    /// Spawns the connection loop. Later calls are no-ops, keeping the
    /// channel a singleton.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Event channel already started");
            return;
        }
        let channel = self.clone();
        tokio::spawn(async move { channel.run().await });
    }

    /// Stops the connection loop; reconnects cease immediately.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Connect, read until the connection drops, wait, repeat.
    async fn run(self: Arc<Self>) {
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Event channel stopped");
                return;
            }

            match connect_async(self.url.as_str()).await {
                Ok((mut stream, _)) => {
                    tracing::info!("Event channel connected to {}", self.url);
                    loop {
                        tokio::select! {
                            _ = self.cancel.cancelled() => {
                                tracing::info!("Event channel stopped");
                                return;
                            }
                            frame = stream.next() => match frame {
                                Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str()),
                                Some(Ok(Message::Close(_))) | None => {
                                    tracing::warn!("Event channel disconnected");
                                    break;
                                }
                                Some(Ok(_)) => {} // binary/ping/pong frames carry no events
                                Some(Err(e)) => {
                                    tracing::warn!("Event channel error: {e}");
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Event channel connect failed: {e}");
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Event channel stopped");
                    return;
                }
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// Parses one inbound frame and republishes it locally.
    fn handle_frame(&self, raw: &str) {
        match serde_json::from_str::<AppEvent>(raw) {
            Ok(event) => {
                tracing::debug!("Event received: {event:?}");
                // No receivers is fine; modules subscribe lazily.
                let _ = self.events.send(event);
            }
            Err(e) => {
                tracing::error!("Discarding malformed channel message: {e}");
            }
        }
    }
}
