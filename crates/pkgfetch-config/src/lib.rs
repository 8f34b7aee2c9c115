//! Configuration loading for pkgfetch
//!
//! This crate resolves the registry URL, cache directory, credentials and
//! retry settings from built-in defaults, `~/.pkgfetch/config.toml`, a project
//! `pkgfetch.toml`, environment variables and CLI flags.

pub mod toml;
pub mod merge;

// Re-export main types
pub use self::toml::{FetchToml, RegistrySection, CacheSection};
pub use self::merge::{ConfigLoader, ConfigLayering, ConfigSource};

use camino::Utf8PathBuf;
use pkgfetch_core::error::FetchError;
use url::Url;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, FetchError>;

/// Public npm registry used when nothing else is configured
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Fully resolved configuration handed to the package-manager client
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Registry base URL (always ends with '/')
    pub registry: Url,
    /// Root of the on-disk tarball cache
    pub cache_dir: Utf8PathBuf,
    /// Bearer token for authentication
    pub token: Option<String>,
    /// Basic auth username
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
    /// Maximum number of retry attempts per request
    pub max_retries: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// How long fetched package metadata stays fresh, in seconds
    pub metadata_ttl_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            // The constant is a valid absolute URL
            registry: Url::parse(DEFAULT_REGISTRY).expect("default registry URL is valid"),
            cache_dir: default_cache_dir(),
            token: None,
            username: None,
            password: None,
            max_retries: 3,
            timeout_secs: 30,
            metadata_ttl_secs: 300,
        }
    }
}

/// `~/.pkgfetch/cache`, or a directory under the system temp dir without a home
pub fn default_cache_dir() -> Utf8PathBuf {
    dirs::home_dir()
        .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
        .map(|home| home.join(".pkgfetch").join("cache"))
        .or_else(|| Utf8PathBuf::from_path_buf(std::env::temp_dir().join("pkgfetch-cache")).ok())
        .unwrap_or_else(|| Utf8PathBuf::from(".pkgfetch-cache"))
}

/// Parse and normalize a registry URL so relative joins keep its path
pub fn parse_registry_url(field: &str, value: &str) -> ConfigResult<Url> {
    let mut url = Url::parse(value).map_err(|e| FetchError::ConfigValidation {
        field: field.to_string(),
        reason: format!("Invalid registry URL '{}': {}", value, e),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::ConfigValidation {
            field: field.to_string(),
            reason: format!("Registry URL must use http or https, got '{}'", url.scheme()),
        });
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.registry.as_str(), DEFAULT_REGISTRY);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.metadata_ttl_secs, 300);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_parse_registry_url_adds_trailing_slash() {
        let url = parse_registry_url("registry", "https://npm.example.com/api/npm").unwrap();
        assert_eq!(url.as_str(), "https://npm.example.com/api/npm/");
        assert_eq!(url.join("bower").unwrap().as_str(), "https://npm.example.com/api/npm/bower");
    }

    #[test]
    fn test_parse_registry_url_rejects_bad_values() {
        assert!(matches!(
            parse_registry_url("registry", "not a url"),
            Err(FetchError::ConfigValidation { .. })
        ));
        assert!(matches!(
            parse_registry_url("registry", "ftp://registry.example.com"),
            Err(FetchError::ConfigValidation { .. })
        ));
    }
}
