//! `pkgfetch releases` command implementation.

use pkgfetch_core::error::{FetchError, FetchResult};
use pkgfetch_registry::list_releases;

use super::CommandContext;

/// Execute the `pkgfetch releases` command
pub async fn execute(package: &str, json: bool, ctx: &CommandContext) -> FetchResult<Vec<String>> {
    let versions = list_releases(&ctx.client, package).await?;

    if versions.is_empty() {
        ctx.output.warn(&format!("{} has no published versions", package));
    } else {
        ctx.output.print(&format_releases(&versions, json)?);
    }

    Ok(versions)
}

/// One version per line, or a JSON array
pub fn format_releases(versions: &[String], json: bool) -> FetchResult<String> {
    if json {
        serde_json::to_string_pretty(versions)
            .map_err(|e| FetchError::io("Failed to encode versions".to_string(), e.into()))
    } else {
        Ok(versions.join("\n"))
    }
}
