//! Error types and result aliases for pkgfetch operations.
//!
//! Provides a unified error type covering every stage of a fetch: loading the
//! package-manager client, querying the registry, populating the cache, and
//! copying tarballs out of it.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause attached to structured error variants
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for all pkgfetch operations
#[derive(Error, Debug)]
pub enum FetchError {
    // Config errors
    #[error("Failed to parse {file}: {message}")]
    TomlParse { file: String, message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Client errors
    #[error("Failed to initialize package manager: {message}")]
    Initialization {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    // Registry errors
    #[error("Package '{name}' not found in registry")]
    PackageNotFound { name: String },

    #[error("No version of '{name}' matches '{selector}'")]
    VersionNotFound { name: String, selector: String },

    #[error("Unexpected registry response for '{package}': {message}")]
    Query { package: String, message: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    // Cache errors
    #[error("Failed to add '{spec}' to cache: {message}")]
    CacheAdd {
        spec: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Integrity check failed for {package}: expected {expected}, got {actual}")]
    IntegrityFailure {
        package: String,
        expected: String,
        actual: String,
    },

    #[error("Permission denied: {permission} access to {resource}")]
    PermissionDenied {
        permission: String,
        resource: String,
    },

    // IO errors
    #[error("Failed to read {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    DestinationWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for pkgfetch operations
pub type FetchResult<T> = Result<T, FetchError>;

impl FetchError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an initialization error from any error type
    pub fn initialization<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Initialization {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create a cache-add error without an underlying cause
    pub fn cache_add(spec: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CacheAdd {
            spec: spec.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FetchError::Network { .. } | FetchError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            FetchError::PackageNotFound { .. } => {
                Some("Check the package name spelling or try searching the registry")
            },
            FetchError::VersionNotFound { .. } => {
                Some("Run 'pkgfetch releases <package>' to list published versions")
            },
            FetchError::Network { .. } => Some("Check your internet connection and try again"),
            FetchError::Initialization { .. } => {
                Some("Check the registry URL and cache directory in your configuration")
            },
            FetchError::IntegrityFailure { .. } => {
                Some("The registry served corrupted data; retry or report it to the registry")
            },
            FetchError::DestinationWrite { .. } => {
                Some("Make sure the target directory exists and is writable")
            },
            FetchError::ConfigValidation { .. } | FetchError::TomlParse { .. } => {
                Some("Fix the configuration file or the PKGFETCH_* environment variables")
            },
            _ => None,
        }
    }
}
