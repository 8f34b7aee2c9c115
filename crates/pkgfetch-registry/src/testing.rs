//! In-memory package manager used by the adapter tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use serde_json::Value;

use pkgfetch_core::FetchError;
use crate::api::Manifest;
use crate::manager::{CommandFuture, ManagerLoader, PackageManager};
use crate::settle::Completion;
use crate::RegistryResult;

type Outcome<T> = Arc<dyn Fn() -> RegistryResult<T> + Send + Sync>;

/// How `cache_add` reports completion
#[derive(Clone)]
pub enum Reporting {
    /// Settle through the callback, return no future
    Callback(Outcome<Manifest>),
    /// Return a future, never touch the callback
    Future(Outcome<Manifest>),
    /// Settle through the callback and also return a future
    Both {
        callback: Outcome<Manifest>,
        future: Outcome<Manifest>,
    },
    /// Settle through the callback from a spawned task
    Spawned(Outcome<Manifest>),
    /// Drop the callback without settling and return no future
    Abandon,
}

pub struct FakeManager {
    root: Utf8PathBuf,
    view: Outcome<Value>,
    reporting: Reporting,
    pub views: Mutex<Vec<(String, String)>>,
    pub adds: Mutex<Vec<String>>,
}

pub fn manifest(name: &str, version: &str) -> Manifest {
    Manifest {
        name: name.to_string(),
        version: version.to_string(),
        dist: None,
        extra: Default::default(),
    }
}

pub fn ok<T: Clone + Send + Sync + 'static>(value: T) -> Outcome<T> {
    Arc::new(move || Ok(value.clone()))
}

pub fn fail<T: 'static>(make: fn() -> FetchError) -> Outcome<T> {
    Arc::new(move || Err(make()))
}

impl FakeManager {
    pub fn new() -> Self {
        Self {
            root: Utf8PathBuf::from("/nonexistent/cache"),
            view: ok(Value::Array(Vec::new())),
            reporting: Reporting::Abandon,
            views: Mutex::new(Vec::new()),
            adds: Mutex::new(Vec::new()),
        }
    }

    pub fn with_root(mut self, root: &Utf8Path) -> Self {
        self.root = root.to_path_buf();
        self
    }

    pub fn with_view(mut self, view: Outcome<Value>) -> Self {
        self.view = view;
        self
    }

    pub fn with_reporting(mut self, reporting: Reporting) -> Self {
        self.reporting = reporting;
        self
    }

    /// Write `<root>/<name>/<version>/package.tgz`
    pub fn seed_tarball(&self, name: &str, version: &str, bytes: &[u8]) -> Utf8PathBuf {
        let layout = pkgfetch_cache::CacheLayout::new(&self.root);
        let path = layout.tarball_path(name, version).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }
}

impl PackageManager for FakeManager {
    fn view<'a>(&'a self, spec: &'a str, field: &'a str) -> CommandFuture<'a, Value> {
        self.views.lock().push((spec.to_string(), field.to_string()));
        let outcome = (self.view)();
        Box::pin(async move { outcome })
    }

    fn cache_add<'a>(
        &'a self,
        spec: &'a str,
        done: Completion<Manifest>,
    ) -> Option<CommandFuture<'a, Manifest>> {
        self.adds.lock().push(spec.to_string());

        match self.reporting.clone() {
            Reporting::Callback(outcome) => {
                done.settle(outcome());
                None
            }
            Reporting::Future(outcome) => Some(Box::pin(async move { outcome() })),
            Reporting::Both { callback, future } => {
                done.settle(callback());
                Some(Box::pin(async move {
                    tokio::task::yield_now().await;
                    future()
                }))
            }
            Reporting::Spawned(outcome) => {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    done.settle(outcome());
                });
                None
            }
            Reporting::Abandon => None,
        }
    }

    fn cache_root(&self) -> &Utf8Path {
        &self.root
    }
}

/// Loader that counts loads and can fail or stall on demand
pub struct FakeLoader {
    template: Mutex<Option<FakeManager>>,
    delay: Duration,
    failures_left: AtomicUsize,
    pub loads: AtomicUsize,
}

impl FakeLoader {
    pub fn new(manager: FakeManager) -> Self {
        Self {
            template: Mutex::new(Some(manager)),
            delay: Duration::ZERO,
            failures_left: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_first(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }
}

impl ManagerLoader for FakeLoader {
    type Manager = FakeManager;

    fn load(&self) -> CommandFuture<'_, FakeManager> {
        Box::pin(async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;

            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok()
            {
                return Err(FetchError::Initialization {
                    message: "client failed to load".to_string(),
                    source: None,
                });
            }

            Ok(self.template.lock().take().unwrap_or_else(FakeManager::new))
        })
    }
}
