//! # pulverhub-session
//!
//! Session handling for the Pulverhub console: the persisted token
//! store, bearer-token expiry decoding, the refresh call, and the
//! startup session guard.

pub mod guard;
pub mod refresh;
pub mod store;
pub mod token;

pub use guard::SessionGuard;
pub use store::SessionStore;
pub use token::TokenClaims;
