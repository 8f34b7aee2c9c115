//! Tarball cache storage for pkgfetch
//!
//! This crate owns the on-disk layout of the package cache
//! (`<root>/<name>/<version>/package.tgz`) and the atomic, back-pressured
//! copy primitive used to move tarballs in and out of it.

pub mod atomic;
pub mod layout;

// Re-export main types
pub use atomic::{copy_file, write_bytes, write_stream, AtomicFile};
pub use layout::CacheLayout;

use pkgfetch_core::error::FetchError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, FetchError>;
