//! The operator notification seam.
//!
//! Blocking alerts, confirmations, and prompts go through this trait so
//! the gateway and the page modules stay independent of the terminal
//! frontend. The console binary provides a dialoguer-backed
//! implementation; tests substitute a recording one.

/// Blocking operator interaction.
pub trait Notifier: Send + Sync {
    /// Shows a blocking notification.
    fn alert(&self, message: &str);

    /// Asks a yes/no question; `false` aborts the calling action.
    fn confirm(&self, message: &str) -> bool;

    /// Asks for a line of input; `None` aborts the calling action.
    fn prompt(&self, message: &str) -> Option<String>;
}
