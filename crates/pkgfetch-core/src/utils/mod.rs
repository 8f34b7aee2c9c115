//! Utility functions and helpers.
//!
//! Common functionality used across multiple pkgfetch crates.

pub mod hash;
pub mod path;

// Re-export commonly used utilities
pub use hash::{sha1_hex, sha512_integrity, IntegrityHasher};
pub use path::{absolutize, is_safe_path, normalize_path, safe_join};
