//! Configuration layering, fallback logic, and environment overrides

use std::collections::HashMap;
use camino::{Utf8Path, Utf8PathBuf};
use pkgfetch_core::error::FetchError;
use crate::toml::FetchToml;
use crate::{ConfigResult, FetchConfig};

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "pkgfetch.toml";

/// Environment variables understood by the loader, lowest priority first.
/// The npm variables describe an existing npm setup and lose to PKGFETCH_*.
const ENV_KEYS: &[&str] = &[
    "npm_config_registry",
    "npm_config_cache",
    "PKGFETCH_REGISTRY",
    "PKGFETCH_CACHE",
    "PKGFETCH_TOKEN",
    "PKGFETCH_USERNAME",
    "PKGFETCH_PASSWORD",
    "PKGFETCH_MAX_RETRIES",
    "PKGFETCH_TIMEOUT",
    "PKGFETCH_METADATA_TTL",
];

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
    /// Home directory override (tests)
    home: Option<Utf8PathBuf>,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Global config file
    Global(Utf8PathBuf),
    /// Project pkgfetch.toml file
    Project(Utf8PathBuf),
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd, home: None }
    }

    /// Use a fixed home directory instead of the user's
    pub fn with_home(mut self, home: Utf8PathBuf) -> Self {
        self.home = Some(home);
        self
    }

    /// Resolve the full configuration: files, environment, then CLI flags
    pub async fn load(&self, cli_overrides: HashMap<String, String>) -> ConfigResult<FetchConfig> {
        let global = self.load_global_config().await?.map(|(config, _)| config);
        let project = self.load_project_config().await?.map(|(config, _)| config);

        let mut config = ConfigLayering::merge_configs(
            global,
            project,
            ConfigLayering::collect_env_overrides(),
            cli_overrides,
        )?;
        config.cache_dir = resolve_cache_dir(&self.cwd, &config.cache_dir);

        Ok(config)
    }

    /// Load the nearest pkgfetch.toml, if any
    pub async fn load_project_config(&self) -> ConfigResult<Option<(FetchToml, ConfigSource)>> {
        let path = self.resolve_config_path(PROJECT_CONFIG_FILE);
        if path.exists() {
            let config = crate::toml::load_from_file(&path).await?;
            return Ok(Some((config, ConfigSource::Project(path))));
        }

        Ok(None)
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> Utf8PathBuf {
        let mut current = self.cwd.as_path();

        loop {
            let config_path = current.join(filename);
            if config_path.exists() {
                return config_path;
            }

            // Move up one directory
            if let Some(parent) = current.parent() {
                current = parent;
            } else {
                // Reached filesystem root
                break;
            }
        }

        // Return path in current directory even if it doesn't exist
        self.cwd.join(filename)
    }

    /// Load global configuration
    pub async fn load_global_config(&self) -> ConfigResult<Option<(FetchToml, ConfigSource)>> {
        let home_dir = match &self.home {
            Some(home) => home.clone(),
            None => {
                let Some(home) = dirs::home_dir() else {
                    return Ok(None);
                };
                Utf8PathBuf::try_from(home).map_err(|e| FetchError::ConfigValidation {
                    field: "home_dir".to_string(),
                    reason: format!("Invalid home directory path: {}", e),
                })?
            },
        };

        let global_config_path = home_dir.join(".pkgfetch").join("config.toml");

        if global_config_path.exists() {
            let config = crate::toml::load_from_file(&global_config_path).await?;
            Ok(Some((config, ConfigSource::Global(global_config_path))))
        } else {
            Ok(None)
        }
    }
}

impl ConfigLayering {
    /// Merge configuration layers onto the built-in defaults
    pub fn merge_configs(
        global_config: Option<FetchToml>,
        project_config: Option<FetchToml>,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<FetchConfig> {
        let mut merged = FetchConfig::default();

        // Project settings win over global ones
        for file in global_config.iter().chain(project_config.iter()) {
            Self::apply_file(&mut merged, file)?;
        }

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut merged, &env_overrides)?;

        // Apply CLI flag overrides (highest priority)
        Self::apply_cli_overrides(&mut merged, &cli_overrides)?;

        Ok(merged)
    }

    /// Apply the values set in one configuration file
    fn apply_file(config: &mut FetchConfig, file: &FetchToml) -> ConfigResult<()> {
        if let Some(url) = &file.registry.url {
            config.registry = crate::parse_registry_url("registry.url", url)?;
        }
        if let Some(token) = &file.registry.token {
            config.token = Some(token.clone());
        }
        if let Some(username) = &file.registry.username {
            config.username = Some(username.clone());
        }
        if let Some(password) = &file.registry.password {
            config.password = Some(password.clone());
        }
        if let Some(max_retries) = file.registry.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(timeout_secs) = file.registry.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        if let Some(dir) = &file.cache.dir {
            config.cache_dir = Utf8PathBuf::from(dir.as_str());
        }
        if let Some(ttl) = file.cache.metadata_ttl_secs {
            config.metadata_ttl_secs = ttl;
        }

        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: &mut FetchConfig, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for key in ENV_KEYS {
            let Some(value) = overrides.get(*key) else {
                continue;
            };

            match *key {
                "npm_config_registry" | "PKGFETCH_REGISTRY" => {
                    config.registry = crate::parse_registry_url(key, value)?;
                }
                "npm_config_cache" | "PKGFETCH_CACHE" => {
                    config.cache_dir = Utf8PathBuf::from(value.as_str());
                }
                "PKGFETCH_TOKEN" => {
                    config.token = Some(value.clone());
                }
                "PKGFETCH_USERNAME" => {
                    config.username = Some(value.clone());
                }
                "PKGFETCH_PASSWORD" => {
                    config.password = Some(value.clone());
                }
                "PKGFETCH_MAX_RETRIES" => {
                    config.max_retries = parse_number(key, value)?;
                }
                "PKGFETCH_TIMEOUT" => {
                    config.timeout_secs = parse_number(key, value)?;
                }
                "PKGFETCH_METADATA_TTL" => {
                    config.metadata_ttl_secs = parse_number(key, value)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(config: &mut FetchConfig, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "registry" => {
                    config.registry = crate::parse_registry_url("--registry", value)?;
                }
                "cache" => {
                    config.cache_dir = Utf8PathBuf::from(value.as_str());
                }
                _ => {
                    // Unknown CLI override, ignore
                }
            }
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        let mut overrides = HashMap::new();

        for (key, value) in std::env::vars() {
            if key.starts_with("PKGFETCH_") {
                overrides.insert(key, value);
            } else if key.to_ascii_lowercase().starts_with("npm_config_") {
                // npm accepts either case for its own variables
                overrides.insert(key.to_ascii_lowercase(), value);
            }
        }

        overrides
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| FetchError::ConfigValidation {
        field: field.to_string(),
        reason: format!("Expected a number, got '{}': {}", value, e),
    })
}

/// Resolve a possibly relative cache directory against a base directory
pub fn resolve_cache_dir(base: &Utf8Path, cache_dir: &Utf8Path) -> Utf8PathBuf {
    if cache_dir.is_absolute() {
        cache_dir.to_path_buf()
    } else {
        base.join(cache_dir)
    }
}
