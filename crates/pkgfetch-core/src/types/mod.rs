//! Core data types for pkgfetch.
//!
//! This module provides the package identifiers used throughout the workspace:
//! - `PackageName` for plain and `@scope/` names
//! - `PackageSpec` for `name@selector` references

pub mod package;

// Re-export all public types
pub use package::{PackageName, PackageSpec};
