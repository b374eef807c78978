//! Cross-crate trait seams.

pub mod notify;

pub use notify::Notifier;
