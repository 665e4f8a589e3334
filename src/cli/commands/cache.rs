//! CLI command for `bundleforge cache`
//!
//! Inspects and clears the artifact cache.

use std::path::Path;

use anyhow::Result;

use crate::cli::output::status;
use crate::config::ServiceConfig;
use crate::core::cache::ArtifactCache;

/// Execute cache info subcommand
pub async fn execute_info() -> Result<()> {
    let config = ServiceConfig::load_or_create(Path::new("bundleforge.toml"))?;
    let cache = ArtifactCache::new(&config.paths.cache_dir);
    let info = cache.info();

    println!("Location:  {}", info.path.display());
    println!("Size:      {}", info.format_size());
    println!("Artifacts: {}", info.artifact_count);

    if !info.exists {
        println!("\n{} Cache directory does not exist yet (empty cache)", status::WARNING);
    }
    Ok(())
}

/// Execute cache clean subcommand
pub async fn execute_clean() -> Result<()> {
    let config = ServiceConfig::load_or_create(Path::new("bundleforge.toml"))?;
    let cache = ArtifactCache::new(&config.paths.cache_dir);

    let freed = cache.clean()?;
    if freed > 0 {
        println!("{} Cache cleared ({freed} bytes freed)", status::SUCCESS);
    } else {
        println!("{} Cache was already empty", status::SUCCESS);
    }
    Ok(())
}
