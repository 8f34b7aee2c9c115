//! # pkgfetch-core
//!
//! Core types and utilities shared across all pkgfetch crates.
//!
//! This crate provides:
//! - `FetchError` enum for unified error handling
//! - Package identifier types (`PackageName`, `PackageSpec`)
//! - Integrity and path helpers used by the cache and registry crates
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Package identifiers and naming rules
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{FetchError, FetchResult};
pub use types::{PackageName, PackageSpec};
