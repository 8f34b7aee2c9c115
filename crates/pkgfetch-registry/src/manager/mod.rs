//! Package-manager seam
//!
//! The fetch adapters only talk to a [`PackageManager`]: something that can
//! answer "view" queries, populate its cache on "cache add", and report where
//! that cache lives. [`SharedManager`] owns the lazily loaded instance and is
//! passed to the adapters explicitly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use camino::Utf8Path;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::api::Manifest;
use crate::settle::Completion;
use crate::RegistryResult;

/// Boxed future returned by package-manager commands
pub type CommandFuture<'a, T> = Pin<Box<dyn Future<Output = RegistryResult<T>> + Send + 'a>>;

/// Commands the fetch adapters need from a package manager
pub trait PackageManager: Send + Sync {
    /// Query `field` of the metadata selected by `spec` (`name[@selector]`).
    ///
    /// One selected version yields the raw field value; several yield an
    /// object keyed by version, each holding `{ field: value }`.
    fn view<'a>(&'a self, spec: &'a str, field: &'a str) -> CommandFuture<'a, Value>;

    /// Download `spec` into the local cache and return its manifest.
    ///
    /// Implementations report through `done`, through the returned future,
    /// or both; callers keep only the first outcome.
    fn cache_add<'a>(
        &'a self,
        spec: &'a str,
        done: Completion<Manifest>,
    ) -> Option<CommandFuture<'a, Manifest>>;

    /// Root of the on-disk cache (`<root>/<name>/<version>/package.tgz`)
    fn cache_root(&self) -> &Utf8Path;
}

/// Builds a package manager (the load/initialize step)
pub trait ManagerLoader: Send + Sync {
    type Manager: PackageManager + 'static;

    fn load(&self) -> CommandFuture<'_, Self::Manager>;
}

/// Lazily loaded package manager shared by every adapter call
pub struct SharedManager<L: ManagerLoader> {
    loader: L,
    manager: OnceCell<Arc<L::Manager>>,
}

impl<L: ManagerLoader> SharedManager<L> {
    /// Load on first use
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            manager: OnceCell::new(),
        }
    }

    /// Start out with an already loaded manager
    pub fn preloaded(loader: L, manager: L::Manager) -> Self {
        Self {
            loader,
            manager: OnceCell::new_with(Some(Arc::new(manager))),
        }
    }

    /// Get the manager, loading it if needed.
    ///
    /// Concurrent first calls share one in-flight load. A failed load is not
    /// remembered, so the next call tries again.
    pub async fn get(&self) -> RegistryResult<Arc<L::Manager>> {
        self.manager
            .get_or_try_init(|| async { self.loader.load().await.map(Arc::new) })
            .await
            .map(Arc::clone)
    }

    /// Check if the manager has been loaded
    pub fn is_loaded(&self) -> bool {
        self.manager.initialized()
    }
}
