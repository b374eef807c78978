//! # pulverhub-core
//!
//! Core crate for the Pulverhub admin console. Contains configuration
//! schemas, realtime event types, table filter types, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other Pulverhub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
