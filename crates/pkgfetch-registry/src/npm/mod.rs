//! Bundled package manager backed by the npm registry
//!
//! [`NpmManager`] answers `view` queries from registry package documents
//! (cached in memory for a configurable TTL) and fills the on-disk tarball
//! cache on `cache add`.

use std::time::Duration;
use camino::{Utf8Path, Utf8PathBuf};
use semver::{Version, VersionReq};
use serde_json::{Map, Value};
use tracing::{debug, info};

use pkgfetch_cache::{write_bytes, CacheLayout};
use pkgfetch_config::FetchConfig;
use pkgfetch_core::error::FetchError;
use pkgfetch_core::types::{PackageName, PackageSpec};
use crate::api::{Manifest, Packument};
use crate::cache::MetadataCache;
use crate::client::RegistryClient;
use crate::manager::{CommandFuture, ManagerLoader, PackageManager};
use crate::settle::Completion;
use crate::RegistryResult;

/// Loads an [`NpmManager`] from resolved configuration
#[derive(Debug, Clone)]
pub struct NpmLoader {
    config: FetchConfig,
}

impl NpmLoader {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }
}

impl ManagerLoader for NpmLoader {
    type Manager = NpmManager;

    fn load(&self) -> CommandFuture<'_, NpmManager> {
        Box::pin(NpmManager::open(&self.config))
    }
}

/// npm registry client plus tarball cache
#[derive(Debug)]
pub struct NpmManager {
    client: RegistryClient,
    metadata: MetadataCache,
    layout: CacheLayout,
}

impl NpmManager {
    /// Build the HTTP client and make sure the cache root exists
    pub async fn open(config: &FetchConfig) -> RegistryResult<Self> {
        let client = RegistryClient::from_config(config)?;

        tokio::fs::create_dir_all(&config.cache_dir)
            .await
            .map_err(|e| {
                FetchError::initialization(
                    format!("Cannot create cache directory {}", config.cache_dir),
                    e,
                )
            })?;

        debug!("Using registry {} with cache {}", client.base_url(), config.cache_dir);

        Ok(Self {
            client,
            metadata: MetadataCache::with_ttl(Duration::from_secs(config.metadata_ttl_secs)),
            layout: CacheLayout::new(&config.cache_dir),
        })
    }

    /// Use an existing client and cache root as-is
    pub fn with_client(client: RegistryClient, cache_root: Utf8PathBuf) -> Self {
        Self {
            client,
            metadata: MetadataCache::new(),
            layout: CacheLayout::new(cache_root),
        }
    }

    /// Package document, from memory when fresh
    pub async fn packument(&self, name: &PackageName) -> RegistryResult<Packument> {
        if let Some(packument) = self.metadata.get(name.as_str()) {
            debug!("Metadata cache hit for {}", name);
            return Ok(packument);
        }

        let packument = self.client.fetch_packument(name).await?;
        self.metadata.insert(name.to_string(), packument.clone());
        Ok(packument)
    }

    /// Query `field` of every version `spec` selects
    pub async fn view_field(&self, spec: &str, field: &str) -> RegistryResult<Value> {
        let spec = PackageSpec::parse(spec);
        let packument = self.packument(&spec.name).await?;
        let selected = select_versions(&packument, &spec)?;

        if let [manifest] = selected.as_slice() {
            return Ok(lookup(&version_record(&packument, manifest)?, field));
        }

        let mut by_version = Map::new();
        for manifest in selected {
            let mut entry = Map::new();
            entry.insert(field.to_string(), lookup(&version_record(&packument, manifest)?, field));
            by_version.insert(manifest.version.clone(), Value::Object(entry));
        }
        Ok(Value::Object(by_version))
    }

    /// Make `spec` available in the tarball cache and return its manifest
    pub async fn add(&self, spec: &str) -> RegistryResult<Manifest> {
        let spec = PackageSpec::parse(spec);

        if let Some(manifest) = self.cached_manifest(&spec).await? {
            debug!("Tarball cache hit for {}", manifest.id());
            return Ok(manifest);
        }

        let packument = self.packument(&spec.name).await?;
        let manifest = select_versions(&packument, &spec)?
            .into_iter()
            .max_by(|a, b| compare_versions(&a.version, &b.version))
            .cloned()
            .ok_or_else(|| version_not_found(&spec))?;

        let size = self.store(&manifest).await?;

        info!("Cached {} ({} bytes)", manifest.id(), size);
        Ok(manifest)
    }

    /// Manifest of an exact version already on disk
    async fn cached_manifest(&self, spec: &PackageSpec) -> RegistryResult<Option<Manifest>> {
        let version = match spec.selector.as_deref() {
            Some(selector) if Version::parse(selector).is_ok() => selector,
            _ => return Ok(None),
        };
        if !self.layout.contains(spec.name.as_str(), version) {
            return Ok(None);
        }

        let path = self.layout.manifest_path(spec.name.as_str(), version)?;
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(_) => return Ok(None),
        };

        // A damaged manifest is refetched rather than trusted
        Ok(serde_json::from_slice::<Manifest>(&content).ok())
    }

    /// Download the tarball into its cache entry, then record the manifest
    async fn store(&self, manifest: &Manifest) -> RegistryResult<u64> {
        let spec = manifest.id();
        let wrap = |message: &str, error: FetchError| FetchError::CacheAdd {
            spec: spec.clone(),
            message: message.to_string(),
            source: Some(Box::new(error)),
        };

        let dir = self.layout.entry_dir(&manifest.name, &manifest.version)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| wrap("cannot create cache entry", FetchError::io(format!("Failed to create {}", dir), e)))?;

        let tarball_path = self.layout.tarball_path(&manifest.name, &manifest.version)?;
        let size = match self.client.download_tarball(manifest, tarball_path.as_std_path()).await {
            Ok(size) => size,
            Err(e) => {
                // Only removes the entry when the failed download left it empty
                let _ = tokio::fs::remove_dir(&dir).await;
                return Err(match e {
                    FetchError::DestinationWrite { .. } => wrap("cannot write tarball", e),
                    other => other,
                });
            }
        };

        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| FetchError::cache_add(spec.clone(), format!("cannot encode manifest: {}", e)))?;
        let manifest_path = self.layout.manifest_path(&manifest.name, &manifest.version)?;
        write_bytes(manifest_path.as_std_path(), &json)
            .await
            .map_err(|e| wrap("cannot write manifest", e))?;

        Ok(size)
    }
}

impl PackageManager for NpmManager {
    fn view<'a>(&'a self, spec: &'a str, field: &'a str) -> CommandFuture<'a, Value> {
        Box::pin(self.view_field(spec, field))
    }

    fn cache_add<'a>(
        &'a self,
        spec: &'a str,
        _done: Completion<Manifest>,
    ) -> Option<CommandFuture<'a, Manifest>> {
        Some(Box::pin(self.add(spec)))
    }

    fn cache_root(&self) -> &Utf8Path {
        self.layout.root()
    }
}

/// Versions selected by a tag, an exact version or a range
fn select_versions<'p>(packument: &'p Packument, spec: &PackageSpec) -> RegistryResult<Vec<&'p Manifest>> {
    let selector = spec.selector_or_latest();

    if let Some(tagged) = packument.dist_tags.get(selector) {
        return packument
            .versions
            .get(tagged)
            .map(|manifest| vec![manifest])
            .ok_or_else(|| version_not_found(spec));
    }

    if let Some(manifest) = packument.versions.get(selector) {
        return Ok(vec![manifest]);
    }

    let alternatives = parse_range(selector).ok_or_else(|| version_not_found(spec))?;
    let selected: Vec<&Manifest> = packument
        .versions
        .values()
        .filter(|manifest| match Version::parse(&manifest.version) {
            Ok(version) => alternatives.iter().any(|req| req.matches(&version)),
            Err(_) => false,
        })
        .collect();

    if selected.is_empty() {
        return Err(version_not_found(spec));
    }
    Ok(selected)
}

/// Convert an npm range (`^1.2 || >= 2.0.0 <3`) into semver requirements.
///
/// Hyphen ranges (`1.0.0 - 2.0.0`) are not supported.
pub(crate) fn parse_range(range: &str) -> Option<Vec<VersionReq>> {
    range
        .split("||")
        .map(|alternative| {
            let mut comparators: Vec<String> = Vec::new();
            let mut pending_operator: Option<&str> = None;

            for token in alternative.split_whitespace() {
                if token == "-" {
                    return None;
                }
                if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
                    pending_operator = Some(token);
                    continue;
                }
                match pending_operator.take() {
                    Some(operator) => comparators.push(format!("{}{}", operator, token)),
                    None => comparators.push(token.to_string()),
                }
            }

            if pending_operator.is_some() {
                return None;
            }
            if comparators.is_empty() {
                return VersionReq::parse("*").ok();
            }
            VersionReq::parse(&comparators.join(", ")).ok()
        })
        .collect()
}

/// Semver order, with unparseable versions sorting first
fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => std::cmp::Ordering::Greater,
        (Err(_), Ok(_)) => std::cmp::Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Manifest fields plus the package-level `versions`, `dist-tags` and `time`
fn version_record(packument: &Packument, manifest: &Manifest) -> RegistryResult<Value> {
    let query_error = |e: serde_json::Error| FetchError::Query {
        package: manifest.id(),
        message: e.to_string(),
    };

    let mut record = match serde_json::to_value(manifest).map_err(query_error)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    record.entry("versions").or_insert_with(|| {
        Value::Array(packument.versions.keys().cloned().map(Value::String).collect())
    });
    if !record.contains_key("dist-tags") {
        record.insert("dist-tags".to_string(), serde_json::to_value(&packument.dist_tags).map_err(query_error)?);
    }
    if !record.contains_key("time") {
        record.insert("time".to_string(), serde_json::to_value(&packument.time).map_err(query_error)?);
    }

    Ok(Value::Object(record))
}

/// Follow a dotted field path; an empty path is the whole record
fn lookup(record: &Value, field: &str) -> Value {
    if field.is_empty() {
        return record.clone();
    }
    field
        .split('.')
        .try_fold(record, |value, segment| value.get(segment))
        .cloned()
        .unwrap_or(Value::Null)
}

fn version_not_found(spec: &PackageSpec) -> FetchError {
    FetchError::VersionNotFound {
        name: spec.name.to_string(),
        selector: spec.selector_or_latest().to_string(),
    }
}
