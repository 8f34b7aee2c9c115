//! # pkgfetch
//!
//! Command-line front end for the npm registry fetch adapters.
//!
//! Parses the command line, sets up logging, resolves configuration and
//! dispatches to the `releases` and `download` handlers.

use clap::{Parser, Subcommand};
use pkgfetch_core::error::{FetchError, FetchResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// List npm package releases and download their tarballs
#[derive(Parser)]
#[command(name = "pkgfetch", version, about = "Fetch package metadata and tarballs from an npm registry")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Registry URL (overrides configuration and environment)
    #[arg(long, global = true, value_name = "URL")]
    pub registry: Option<String>,

    /// Tarball cache directory
    #[arg(long, global = true, value_name = "DIR")]
    pub cache: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the published versions of a package
    Releases {
        package: String,
        /// Print a JSON array instead of one version per line
        #[arg(long)]
        json: bool,
    },
    /// Download a package tarball into a directory
    Download {
        package: String,
        version: String,
        /// Directory to write `<name>-<version>.tgz` into
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

impl Cli {
    /// Flags that override configuration values
    fn config_overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(registry) = &self.registry {
            overrides.insert("registry".to_string(), registry.clone());
        }
        if let Some(cache) = &self.cache {
            overrides.insert("cache".to_string(), cache.clone());
        }
        overrides
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    debug!("Starting pkgfetch v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", ErrorFormatter::new().format_error(&error));
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> FetchResult<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| FetchError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.config_overrides()).await?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "pkgfetch={level},pkgfetch_registry={level},pkgfetch_cache={level},pkgfetch_config={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("pkgfetch encountered an unexpected error: {}", panic_info);
        eprintln!("pkgfetch crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
