//! npm registry API response types

use std::collections::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};


/// Package document ("packument") returned by `GET <registry>/<name>`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Packument {
    /// Package name
    pub name: String,
    /// Package description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tag to version mapping (`latest`, `next`, ...)
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
    /// All published versions, in registry order
    #[serde(default)]
    pub versions: IndexMap<String, Manifest>,
    /// Publication times keyed by version (plus `created` / `modified`)
    #[serde(default)]
    pub time: HashMap<String, String>,
}

/// Metadata for one published version
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Manifest {
    /// Package name as normalized by the registry
    #[serde(default)]
    pub name: String,
    /// Version string
    pub version: String,
    /// Distribution information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<DistInfo>,
    /// Every other field the registry sent, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Distribution information for package tarball
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DistInfo {
    /// Tarball download URL
    pub tarball: String,
    /// SHA-1 checksum (legacy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,
    /// Subresource integrity hash (preferred)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    /// Unpackaged size in bytes
    #[serde(rename = "unpackedSize", default, skip_serializing_if = "Option::is_none")]
    pub unpacked_size: Option<u64>,
    /// File count
    #[serde(rename = "fileCount", default, skip_serializing_if = "Option::is_none")]
    pub file_count: Option<u32>,
}

impl Packument {
    /// Published version strings in registry order
    pub fn version_list(&self) -> Vec<String> {
        self.versions.keys().cloned().collect()
    }

    /// Fill in manifest names the registry left out
    pub fn normalize(mut self) -> Self {
        for manifest in self.versions.values_mut() {
            if manifest.name.is_empty() {
                manifest.name = self.name.clone();
            }
        }
        self
    }
}

impl Manifest {
    /// `name@version`
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}
