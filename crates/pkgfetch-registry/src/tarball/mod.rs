//! Tarball download
//!
//! Asks the package manager to cache `name@version`, then copies the cached
//! `package.tgz` into the caller's directory as `<name>-<version>.tgz`
//! (`@scope/pkg` becomes `scope-pkg`).

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use pkgfetch_cache::{copy_file, CacheLayout};
use pkgfetch_core::error::FetchError;
use pkgfetch_core::types::{PackageName, PackageSpec};
use pkgfetch_core::utils::absolutize;
use crate::api::Manifest;
use crate::manager::{ManagerLoader, PackageManager, SharedManager};
use crate::settle::settle_once;
use crate::RegistryResult;

/// Download `package_name@version` into `target_dir`.
///
/// `target_dir` must already exist. Returns the absolute path of the written
/// file.
pub async fn download_tarball<L: ManagerLoader>(
    client: &SharedManager<L>,
    package_name: &str,
    version: &str,
    target_dir: impl AsRef<Path>,
) -> RegistryResult<PathBuf> {
    let target_dir = absolutize(target_dir.as_ref())?;
    let manager = client.get().await?;

    let spec = PackageSpec::exact(package_name, version).to_string();
    let manifest = add_to_cache(manager.as_ref(), &spec).await?;

    // The registry may normalize the name or version it was asked for
    let name = if manifest.name.is_empty() { package_name } else { manifest.name.as_str() };
    let version = if manifest.version.is_empty() { version } else { manifest.version.as_str() };

    let source = CacheLayout::new(manager.cache_root()).tarball_path(name, version)?;
    let dest = target_dir.join(PackageName::new(name).tarball_file_name(version));

    debug!("Copying {} to {}", source, dest.display());
    match copy_file(source.as_std_path(), &dest).await {
        Ok(_) => Ok(dest),
        Err(error) => {
            warn!("Failed to copy {}@{} out of the cache: {}", name, version, error);
            Err(error)
        }
    }
}

/// Run `cache add` and wait for its first reported outcome
pub async fn add_to_cache<M>(manager: &M, spec: &str) -> RegistryResult<Manifest>
where
    M: PackageManager + ?Sized,
{
    let (done, settled) = settle_once();
    let command = manager.cache_add(spec, done.clone());

    let outcome = settled.wait();
    tokio::pin!(outcome);

    if let Some(command) = command {
        tokio::select! {
            biased;
            // The callback already reported
            first = &mut outcome => return finish(spec, first),
            result = command => {
                done.settle(result);
            }
        }
    }

    drop(done);
    finish(spec, outcome.await)
}

fn finish(spec: &str, outcome: Option<RegistryResult<Manifest>>) -> RegistryResult<Manifest> {
    outcome.unwrap_or_else(|| Err(FetchError::cache_add(spec, "completed without a result")))
}
