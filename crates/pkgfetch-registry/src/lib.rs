//! npm registry client and package fetch adapters for pkgfetch
//!
//! This crate provides two operations, [`list_releases`] and
//! [`download_tarball`], written against the [`PackageManager`] seam. The
//! bundled [`NpmManager`] implements that seam with an HTTP registry client
//! (retry, integrity checks, metadata caching) and an on-disk tarball cache.

pub mod api;
pub mod cache;
pub mod client;
pub mod manager;
pub mod npm;
pub mod releases;
pub mod settle;
pub mod tarball;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use client::{RegistryClient, RetryConfig, AuthConfig};
pub use api::{Packument, Manifest, DistInfo};
pub use cache::MetadataCache;
pub use manager::{CommandFuture, ManagerLoader, PackageManager, SharedManager};
pub use npm::{NpmLoader, NpmManager};
pub use releases::{list_releases, select_release_versions};
pub use settle::{settle_once, Completion, Settled};
pub use tarball::{add_to_cache, download_tarball};

use pkgfetch_core::error::FetchError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, FetchError>;
