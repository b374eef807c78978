//! Application result alias.

use crate::error::AppError;

/// Shorthand result type used across all Pulverhub crates.
pub type AppResult<T> = Result<T, AppError>;
