//! CLI command for `bundleforge catalog`
//!
//! Refreshes and inspects the extension catalog.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::output::{status, OutputOptions};
use crate::config::ServiceConfig;
use crate::core::extension::Catalog;
use crate::registry::client::CatalogClient;

/// Execute catalog update subcommand
pub async fn execute_update() -> Result<()> {
    let config = ServiceConfig::load_or_create(Path::new("bundleforge.toml"))?;

    println!("Updating extension catalog from {} ...", config.upstream.api_base);
    let client = CatalogClient::new(&config.upstream.api_base, &config.upstream.organization);
    let catalog = client
        .fetch_catalog(&config.upstream)
        .await
        .context("Failed to assemble catalog")?;

    catalog.save(&config.paths.catalog_path)?;
    println!(
        "{} Catalog written to {} ({} frontend, {} backend entries)",
        status::SUCCESS,
        config.paths.catalog_path.display(),
        catalog.frontend.len(),
        catalog.backend.len(),
    );
    Ok(())
}

/// Execute catalog list subcommand
pub async fn execute_list(options: OutputOptions) -> Result<()> {
    let config = ServiceConfig::load_or_create(Path::new("bundleforge.toml"))?;
    let catalog = Catalog::load(&config.paths.catalog_path)
        .context("no usable catalog; run 'bundleforge catalog update' first")?;

    if options.json {
        println!("{}", catalog.to_json()?);
        return Ok(());
    }

    for extension in catalog.all() {
        let marker = if extension.is_base {
            "base"
        } else if extension.active {
            "ext"
        } else {
            "inactive"
        };
        println!(
            "[{:<8}] {:<10} {:<40} {}",
            marker, extension.group, extension.name, extension.version
        );
    }
    Ok(())
}
