//! Command implementations and dispatch logic.
//!
//! Each command is an async function that takes a [`CommandContext`], which
//! owns the lazily loaded package manager shared by every command.

use camino::Utf8PathBuf;
use pkgfetch_config::{ConfigLoader, FetchConfig};
use pkgfetch_core::error::{FetchError, FetchResult};
use pkgfetch_registry::{NpmLoader, SharedManager};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

pub mod download;
pub mod releases;


use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: PathBuf,
    pub output: OutputHandler,
    pub client: SharedManager<NpmLoader>,
}

impl CommandContext {
    /// Resolve configuration for the current directory
    pub async fn new(cli_overrides: HashMap<String, String>) -> FetchResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| FetchError::io("Failed to get current directory".to_string(), e))?;

        let cwd_utf8 = Utf8PathBuf::from_path_buf(cwd.clone()).map_err(|path| FetchError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("{} is not valid UTF-8", path.display()),
        })?;

        let config = ConfigLoader::new(cwd_utf8).load(cli_overrides).await?;
        debug!("Registry {}, cache {}", config.registry, config.cache_dir);

        Ok(Self::with_config(cwd, config))
    }

    /// Build a context from an already resolved configuration
    pub fn with_config(cwd: PathBuf, config: FetchConfig) -> Self {
        Self {
            cwd,
            output: OutputHandler::new(),
            client: SharedManager::new(NpmLoader::new(config)),
        }
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> FetchResult<()> {
    match command {
        Commands::Releases { package, json } => {
            debug!("Listing releases of {}", package);
            releases::execute(&package, json, ctx).await.map(drop)
        }
        Commands::Download { package, version, dir } => {
            debug!("Downloading {}@{} into {}", package, version, dir.display());
            download::execute(&package, &version, &dir, ctx).await.map(drop)
        }
    }
}
