//! # pulverhub-app
//!
//! The application layer of the console: the shared [`AppContext`], the
//! navigation/content loader, the typed page-module registry, the table
//! view model, and the three admin page modules (roles, users,
//! inventory).

pub mod content;
pub mod context;
pub mod modules;
pub mod registry;
pub mod view;

pub use content::{ContentLoader, PageContent};
pub use context::AppContext;
pub use registry::{ModuleRegistry, PageModule};
