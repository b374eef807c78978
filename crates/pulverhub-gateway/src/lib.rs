//! # pulverhub-gateway
//!
//! The authenticated HTTP layer of the console: the bearer-token
//! request gateway with proactive refresh, the de-duplicated
//! current-user profile cache, and typed clients for the roles, users,
//! and inventory endpoints.

pub mod api;
pub mod client;
pub mod profile;

pub use client::ApiGateway;
pub use profile::CurrentUserCache;
