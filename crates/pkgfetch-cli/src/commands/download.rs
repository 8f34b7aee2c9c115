//! `pkgfetch download` command implementation.

use pkgfetch_core::error::FetchResult;
use pkgfetch_registry::download_tarball;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::CommandContext;

/// Execute the `pkgfetch download` command
pub async fn execute(package: &str, version: &str, dir: &Path, ctx: &CommandContext) -> FetchResult<PathBuf> {
    let start_time = Instant::now();
    let target = ctx.cwd.join(dir);

    let written = download_tarball(&ctx.client, package, version, &target).await?;

    ctx.output.success(&format!(
        "Downloaded {}@{} in {:.2}s",
        package,
        version,
        start_time.elapsed().as_secs_f64()
    ));
    ctx.output.print(&written.display().to_string());

    Ok(written)
}
