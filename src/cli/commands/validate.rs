//! CLI command for `bundleforge validate`
//!
//! Runs the shared configuration validator against a bundle plan. The
//! build service applies exactly the same checks at submission time.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::output::{status, OutputOptions};
use crate::config::ServiceConfig;
use crate::core::extension::{BundlePlan, Catalog};
use crate::core::validate::{direct_requirements, validate};

/// Execute the validate command
pub async fn execute(plan_path: &str, options: OutputOptions) -> Result<()> {
    let config = ServiceConfig::load_or_create(Path::new("bundleforge.toml"))?;
    let catalog = Catalog::load(&config.paths.catalog_path)
        .context("no usable catalog; run 'bundleforge catalog update' first")?;

    let plan_content = std::fs::read_to_string(plan_path)
        .with_context(|| format!("Failed to read plan '{plan_path}'"))?;
    let plan = BundlePlan::from_toml(&plan_content)
        .with_context(|| format!("Failed to parse plan '{plan_path}'"))?;

    let mut wanted = Vec::new();
    let mut unknown = Vec::new();
    for request in &plan.extensions {
        match catalog.lookup(&request.name, &request.version) {
            Some(extension) => wanted.push(extension.clone()),
            None => unknown.push(format!("{}@{}", request.name, request.version)),
        }
    }

    if !unknown.is_empty() {
        anyhow::bail!("unknown extensions in plan: {}", unknown.join(", "));
    }

    let report = validate(&wanted, &catalog);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.is_valid() {
        println!("{} Configuration is valid ({} extensions)", status::SUCCESS, report.selected);
    } else {
        println!("{} Configuration is invalid:", status::ERROR);
        for name in &report.duplicates {
            println!("  - '{name}' selected more than once");
        }
        for missing in &report.missing {
            println!("  - '{}' requires '{}'", missing.required_by, missing.name);
        }
        for unresolved in &report.unresolved {
            println!(
                "  - '{}' depends on unknown extension '{}'",
                unresolved.extension, unresolved.requirement
            );
        }
        for conflict in &report.conflicts {
            println!(
                "  - '{}' is incompatible with '{}'",
                conflict.extension, conflict.incompatible_with
            );
        }

        let needed = direct_requirements(&wanted, &catalog);
        if !needed.is_empty() {
            println!("\nAdd these to satisfy direct requirements: {}", needed.join(", "));
        }
    }

    if report.is_valid() {
        Ok(())
    } else {
        anyhow::bail!("configuration is invalid")
    }
}
