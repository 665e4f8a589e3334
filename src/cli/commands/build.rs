//! CLI command for `bundleforge build`
//!
//! Submits a bundle plan and follows the build through its stages.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::output::{create_spinner, status, OutputOptions};
use crate::config::ServiceConfig;
use crate::core::cache::ArtifactCache;
use crate::core::extension::{BundlePlan, Catalog};
use crate::core::service::BuildService;
use crate::core::task::{BuildState, BuildTask, Submission};
use crate::infra::toolchain::ProcessToolchain;

/// Execute the build command
pub async fn execute(plan_path: &str, output: Option<&str>, options: OutputOptions) -> Result<()> {
    let config = ServiceConfig::load_or_create(Path::new("bundleforge.toml"))?;
    let catalog = Catalog::load(&config.paths.catalog_path)
        .context("no usable catalog; run 'bundleforge catalog update' first")?;

    let plan_content = std::fs::read_to_string(plan_path)
        .with_context(|| format!("Failed to read plan '{plan_path}'"))?;
    let plan = BundlePlan::from_toml(&plan_content)
        .with_context(|| format!("Failed to parse plan '{plan_path}'"))?;

    let toolchain = Arc::new(ProcessToolchain::new(config.step_timeout()));
    let service = BuildService::new(
        catalog,
        toolchain,
        ArtifactCache::new(&config.paths.cache_dir),
        config.paths.tmp_dir.clone(),
        config.build.max_parallel_builds,
    );

    let submission = service.submit(&plan.extensions).await?;
    let token = submission.token().clone();
    println!("Build token: {token}");

    let artifact = match &submission {
        Submission::Cached(token) => {
            println!("{} Artifact already cached", status::SUCCESS);
            service.download(token)?
        }
        Submission::Existing(task) | Submission::Started(task) => {
            let final_state = follow(task, options).await;
            if final_state != BuildState::Ready {
                anyhow::bail!("build {token} failed; see the log for the failing stage");
            }
            service.download(&token)?
        }
    };

    println!("{} Bundle ready: {}", status::SUCCESS, artifact.display());

    if let Some(output) = output {
        std::fs::copy(&artifact, output)
            .with_context(|| format!("Failed to copy artifact to '{output}'"))?;
        println!("{} Copied to: {output}", status::SUCCESS);
    }

    Ok(())
}

/// Follow a task's state transitions until it terminates
async fn follow(task: &BuildTask, options: OutputOptions) -> BuildState {
    let spinner = (!options.quiet).then(|| create_spinner("starting build"));
    let mut rx = task.subscribe();

    let final_state = loop {
        let state = *rx.borrow_and_update();
        if let Some(pb) = &spinner {
            pb.set_message(format!("stage: {state}"));
        }
        if state.is_terminal() {
            break state;
        }
        if rx.changed().await.is_err() {
            break task.status();
        }
    };

    if let Some(pb) = spinner {
        pb.finish_with_message(format!("stage: {final_state}"));
    }
    final_state
}
