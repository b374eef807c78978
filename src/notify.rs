//! Terminal implementation of the operator notification seam.

use dialoguer::{Confirm, Input};

use pulverhub_core::traits::Notifier;

/// Blocking terminal notifications via stdout and dialoguer.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        println!("⚠ {message}");
    }

    fn confirm(&self, message: &str) -> bool {
        Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .unwrap_or(false)
    }

    fn prompt(&self, message: &str) -> Option<String> {
        Input::<String>::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()
            .ok()
            .filter(|text| !text.trim().is_empty())
    }
}
