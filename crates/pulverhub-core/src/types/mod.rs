//! Shared plain types.

pub mod filter;

pub use filter::{FilterColumn, TableFilter};
