//! Cache directory layout
//!
//! Every cached package version lives in its own directory:
//!
//! ```text
//! <root>/<name>/<version>/package.tgz
//! <root>/<name>/<version>/package.json
//! ```
//!
//! Scoped names nest one level deeper (`<root>/@scope/pkg/<version>/...`).

use camino::{Utf8Path, Utf8PathBuf};
use pkgfetch_core::error::FetchError;
use pkgfetch_core::utils::safe_join;
use std::path::Path;

use crate::CacheResult;

/// File name of the cached archive inside a version directory
pub const TARBALL_FILE: &str = "package.tgz";

/// File name of the cached manifest inside a version directory
pub const MANIFEST_FILE: &str = "package.json";

/// Paths inside the package cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    /// Root directory for storage (~/.pkgfetch/cache)
    root: Utf8PathBuf,
}

impl CacheLayout {
    /// Create a layout rooted at `root`
    pub fn new<P: AsRef<Utf8Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root path of the cache
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Directory holding one package version
    pub fn entry_dir(&self, name: &str, version: &str) -> CacheResult<Utf8PathBuf> {
        validate_name(name)?;
        validate_segment(version, version)?;

        let relative = Utf8PathBuf::from(name).join(version);
        let joined = safe_join(self.root.as_std_path(), Path::new(relative.as_str()))?;

        // Both inputs were UTF-8, so the joined path is too
        Utf8PathBuf::from_path_buf(joined).map_err(|path| FetchError::PermissionDenied {
            permission: "cache path".to_string(),
            resource: path.display().to_string(),
        })
    }

    /// Expected location of a cached tarball
    pub fn tarball_path(&self, name: &str, version: &str) -> CacheResult<Utf8PathBuf> {
        Ok(self.entry_dir(name, version)?.join(TARBALL_FILE))
    }

    /// Expected location of a cached manifest
    pub fn manifest_path(&self, name: &str, version: &str) -> CacheResult<Utf8PathBuf> {
        Ok(self.entry_dir(name, version)?.join(MANIFEST_FILE))
    }

    /// Check if both the tarball and the manifest of a version are cached
    pub fn contains(&self, name: &str, version: &str) -> bool {
        match (self.tarball_path(name, version), self.manifest_path(name, version)) {
            (Ok(tarball), Ok(manifest)) => tarball.is_file() && manifest.is_file(),
            _ => false,
        }
    }
}

/// Package names are `name` or `@scope/name`
fn validate_name(name: &str) -> CacheResult<()> {
    let mut segments = name.split('/');
    let first = segments.next().unwrap_or_default();

    if first.starts_with('@') {
        validate_segment(name, &first[1..])?;
        let pkg = segments.next().ok_or_else(|| invalid(name))?;
        validate_segment(name, pkg)?;
    } else {
        validate_segment(name, first)?;
    }

    if segments.next().is_some() {
        return Err(invalid(name));
    }

    Ok(())
}

fn validate_segment(whole: &str, segment: &str) -> CacheResult<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
    {
        return Err(invalid(whole));
    }
    Ok(())
}

fn invalid(resource: &str) -> FetchError {
    FetchError::PermissionDenied {
        permission: "cache path".to_string(),
        resource: resource.to_string(),
    }
}
