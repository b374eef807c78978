//! Typed clients for the Pulverlager REST endpoints.

pub mod pulver;
pub mod roles;
pub mod users;

pub use pulver::PulverApi;
pub use roles::RolesApi;
pub use users::UsersApi;
