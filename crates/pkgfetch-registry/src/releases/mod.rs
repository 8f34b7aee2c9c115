//! Release listing
//!
//! A `versions` view answers either with the version array itself or, when
//! several versions were selected, with an object keyed by version. The
//! object case keeps the record under the lexicographically greatest key,
//! which is plain string order and not semver order (`"9.0.0"` sorts after
//! `"10.0.0"`).

use serde_json::Value;
use tracing::debug;

use pkgfetch_core::error::FetchError;
use crate::manager::{ManagerLoader, PackageManager, SharedManager};
use crate::RegistryResult;

/// Field queried for the release list
pub const VERSIONS_FIELD: &str = "versions";

/// List the published versions of `package_name`
pub async fn list_releases<L: ManagerLoader>(
    client: &SharedManager<L>,
    package_name: &str,
) -> RegistryResult<Vec<String>> {
    let manager = client.get().await?;
    let response = manager.view(package_name, VERSIONS_FIELD).await?;
    let versions = select_release_versions(package_name, response)?;

    debug!("{} has {} releases", package_name, versions.len());
    Ok(versions)
}

/// Turn a `versions` view response into the version list
pub fn select_release_versions(package: &str, response: Value) -> RegistryResult<Vec<String>> {
    let unexpected = |message: &str| FetchError::Query {
        package: package.to_string(),
        message: message.to_string(),
    };

    let versions = match response {
        Value::Array(versions) => versions,
        Value::Object(mut by_version) => {
            let latest = by_version
                .keys()
                .max()
                .cloned()
                .ok_or_else(|| unexpected("empty versions object"))?;
            match by_version.remove(&latest) {
                Some(Value::Object(mut record)) => match record.remove(VERSIONS_FIELD) {
                    Some(Value::Array(versions)) => versions,
                    _ => return Err(unexpected("selected record has no versions array")),
                },
                _ => return Err(unexpected("selected record is not an object")),
            }
        }
        other => return Err(unexpected(&format!("expected an array or object, got {}", other))),
    };

    versions
        .into_iter()
        .map(|version| match version {
            Value::String(version) => Ok(version),
            other => Err(unexpected(&format!("non-string version {}", other))),
        })
        .collect()
}
