//! The admin page modules.
//!
//! All three follow the same pattern: one typed action dispatch entry
//! point, one guarded realtime subscription, list loads into a
//! [`TableView`](crate::view::TableView), permission pre-checks before
//! every mutating action, and fresh single-record fetches before edits.

pub mod pulver;
pub mod roles;
pub mod users;

pub use pulver::{PulverAction, PulverModule};
pub use roles::{RoleAction, RolesModule};
pub use users::{UserAction, UsersModule};

use pulverhub_core::traits::Notifier;
use pulverhub_core::{AppError, AppResult};

/// Reports a failed operation to the operator and swallows it.
///
/// Session errors propagate instead: they mean the forced-logout path
/// already ran and the console has to return to the login screen.
pub(crate) fn report_error(notifier: &dyn Notifier, error: AppError) -> AppResult<()> {
    if error.is_session() {
        return Err(error);
    }
    notifier.alert(&format!("Fehler: {}", error.message));
    Ok(())
}

/// Renders an optional text cell, `-` when absent.
pub(crate) fn text_cell(value: &Option<String>) -> String {
    match value {
        Some(value) if !value.is_empty() => value.clone(),
        _ => "-".to_string(),
    }
}

/// Renders an optional numeric cell, `-` when absent.
pub(crate) fn number_cell(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value}"),
        None => "-".to_string(),
    }
}
