//! pkgfetch.toml configuration parsing and serialization

use serde::{Deserialize, Serialize};
use pkgfetch_core::error::FetchError;
use crate::ConfigResult;

/// Complete pkgfetch.toml (or ~/.pkgfetch/config.toml) file.
///
/// Every field is optional; unset values fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchToml {
    /// Registry access settings
    #[serde(default)]
    pub registry: RegistrySection,

    /// Tarball and metadata cache settings
    #[serde(default)]
    pub cache: CacheSection,
}

/// `[registry]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RegistrySection {
    /// Registry base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Basic auth username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Retry attempts per request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// `[cache]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CacheSection {
    /// Cache root directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Metadata freshness in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_ttl_secs: Option<u64>,
}

/// Parse TOML string to FetchToml configuration
pub fn parse_fetch_toml(file: &str, content: &str) -> ConfigResult<FetchToml> {
    let config: FetchToml = toml::from_str(content)
        .map_err(|e| FetchError::TomlParse {
            file: file.to_string(),
            message: e.to_string(),
        })?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize FetchToml to TOML string
pub fn serialize_fetch_toml(config: &FetchToml) -> ConfigResult<String> {
    toml::to_string_pretty(config)
        .map_err(|e| FetchError::TomlParse {
            file: "<memory>".to_string(),
            message: format!("TOML serialization error: {}", e),
        })
}

/// Validate field values that TOML typing alone does not catch
pub fn validate_config(config: &FetchToml) -> ConfigResult<()> {
    if let Some(url) = &config.registry.url {
        crate::parse_registry_url("registry.url", url)?;
    }

    if config.registry.password.is_some() && config.registry.username.is_none() {
        return Err(FetchError::ConfigValidation {
            field: "registry.password".to_string(),
            reason: "A password requires registry.username".to_string(),
        });
    }

    if config.registry.timeout_secs == Some(0) {
        return Err(FetchError::ConfigValidation {
            field: "registry.timeout-secs".to_string(),
            reason: "Timeout must be at least one second".to_string(),
        });
    }

    if let Some(dir) = &config.cache.dir {
        if dir.trim().is_empty() {
            return Err(FetchError::ConfigValidation {
                field: "cache.dir".to_string(),
                reason: "Cache directory must not be empty".to_string(),
            });
        }
    }

    Ok(())
}

/// Load and parse a configuration file
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<FetchToml> {
    let content = tokio::fs::read_to_string(path).await
        .map_err(|e| FetchError::io(format!("Failed to read {}", path), e))?;

    parse_fetch_toml(path.as_str(), &content)
}
