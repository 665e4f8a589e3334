//! Build pipeline
//!
//! Drives one build through its ordered stages, invoking external
//! toolchain steps and collecting their outputs into a staging directory:
//!
//! ```text
//! <tmp>/<id>/build/          checkouts, exclusively owned by this task
//! <tmp>/<id>/out/frontend/   production frontend bundle
//! <tmp>/<id>/out/backend/    one file per backend/extension artifact
//! ```
//!
//! The first failing stage aborts the remainder; the working directory is
//! removed on success and failure alike.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;

use crate::core::cache::{ArtifactCache, ARTIFACT_EXT};
use crate::core::extension::{ExtensionGroup, ResolvedExtension};
use crate::core::task::{BuildState, BuildTask};
use crate::error::{PipelineError, ToolchainError};
use crate::infra::filesystem;
use crate::infra::toolchain::Toolchain;

fn stage_err(stage: BuildState) -> impl Fn(ToolchainError) -> PipelineError {
    move |source| PipelineError::Stage { stage, source }
}

/// One pipeline execution over an injected toolchain
pub struct BuildPipeline<'a, T: Toolchain> {
    toolchain: &'a T,
    cache: &'a ArtifactCache,
    tmp_dir: &'a Path,
}

impl<'a, T: Toolchain> BuildPipeline<'a, T> {
    /// Create a pipeline bound to a toolchain, cache, and tmp directory
    pub fn new(toolchain: &'a T, cache: &'a ArtifactCache, tmp_dir: &'a Path) -> Self {
        Self {
            toolchain,
            cache,
            tmp_dir,
        }
    }

    /// Run all stages for `task`, returning the cached artifact path
    ///
    /// The task's state is advanced as stages begin; terminal transitions
    /// are the registry's responsibility.
    pub async fn run(&self, task: &BuildTask) -> Result<PathBuf, PipelineError> {
        let workdir = self.tmp_dir.join(task.token().as_str());
        let result = self.run_stages(task, &workdir).await;

        // Scoped cleanup on both paths; a failed removal must not mask the
        // build outcome.
        if let Err(error) = filesystem::remove_dir_all(&workdir) {
            tracing::warn!(id = %task.token(), error = %error, "failed to remove build directory");
        }

        result
    }

    async fn run_stages(&self, task: &BuildTask, workdir: &Path) -> Result<PathBuf, PipelineError> {
        let configuration = task.configuration();
        let build_dir = workdir.join("build");
        let out_dir = workdir.join("out");
        let backend_out = out_dir.join("backend");

        for dir in [&build_dir, &out_dir, &backend_out] {
            filesystem::create_dir_all(dir).map_err(|source| PipelineError::Filesystem {
                stage: BuildState::Init,
                source,
            })?;
        }

        // Frontend: one checkout, extensions installed into it, one bundle
        task.advance(BuildState::FrontendPrepare);
        let frontend_base =
            configuration
                .base(ExtensionGroup::Frontend)
                .ok_or(PipelineError::MissingBase {
                    stage: BuildState::FrontendPrepare,
                    group: ExtensionGroup::Frontend,
                })?;
        let frontend_checkout = build_dir.join(&frontend_base.name);
        self.toolchain
            .clone_at(
                &frontend_base.repository,
                &frontend_base.commit,
                &frontend_checkout,
            )
            .await
            .map_err(stage_err(BuildState::FrontendPrepare))?;
        self.toolchain
            .prepare_frontend(&frontend_checkout)
            .await
            .map_err(stage_err(BuildState::FrontendPrepare))?;

        task.advance(BuildState::FrontendExtension);
        for extension in configuration.group_extensions(ExtensionGroup::Frontend) {
            self.toolchain
                .install_frontend_extension(
                    &frontend_checkout,
                    &extension.repository,
                    &extension.commit,
                )
                .await
                .map_err(stage_err(BuildState::FrontendExtension))?;
        }

        task.advance(BuildState::Frontend);
        let bundle = self
            .toolchain
            .build_frontend(&frontend_checkout)
            .await
            .map_err(stage_err(BuildState::Frontend))?;
        filesystem::move_path(&bundle, &out_dir.join("frontend")).map_err(|source| {
            PipelineError::Filesystem {
                stage: BuildState::Frontend,
                source,
            }
        })?;

        // Backend: the base module plus each extension as its own build
        task.advance(BuildState::BackendPrepare);
        let backend_base =
            configuration
                .base(ExtensionGroup::Backend)
                .ok_or(PipelineError::MissingBase {
                    stage: BuildState::BackendPrepare,
                    group: ExtensionGroup::Backend,
                })?;
        let backend_checkout = build_dir.join(&backend_base.name);
        self.toolchain
            .clone_at(
                &backend_base.repository,
                &backend_base.commit,
                &backend_checkout,
            )
            .await
            .map_err(stage_err(BuildState::BackendPrepare))?;

        task.advance(BuildState::Backend);
        let artifacts = self
            .toolchain
            .assemble_backend(&backend_checkout)
            .await
            .map_err(stage_err(BuildState::Backend))?;
        collect_artifacts(&artifacts, &backend_out, None, BuildState::Backend)?;

        task.advance(BuildState::BackendExtension);
        let extension_builds = configuration
            .group_extensions(ExtensionGroup::Backend)
            .map(|extension| self.build_backend_extension(&build_dir, &backend_out, extension));
        try_join_all(extension_builds).await?;

        // Packing: archive the staging directory and move it into the cache
        task.advance(BuildState::Packing);
        let archive = workdir.join(format!("bundle.{ARTIFACT_EXT}"));
        self.toolchain
            .archive(&out_dir, &archive)
            .await
            .map_err(stage_err(BuildState::Packing))?;
        let cached = self
            .cache
            .store(&archive, task.token())
            .map_err(|source| PipelineError::Cache {
                stage: BuildState::Packing,
                source,
            })?;

        Ok(cached)
    }

    /// Clone and assemble one backend extension
    ///
    /// Runs concurrently with its siblings; any failure fails the whole
    /// task, there is no partial-success packaging.
    async fn build_backend_extension(
        &self,
        build_dir: &Path,
        backend_out: &Path,
        extension: &ResolvedExtension,
    ) -> Result<(), PipelineError> {
        let checkout = build_dir.join(&extension.name);
        self.toolchain
            .clone_at(&extension.repository, &extension.commit, &checkout)
            .await
            .map_err(stage_err(BuildState::BackendExtension))?;
        let artifacts = self
            .toolchain
            .assemble_backend(&checkout)
            .await
            .map_err(stage_err(BuildState::BackendExtension))?;
        collect_artifacts(
            &artifacts,
            backend_out,
            Some(&extension.name),
            BuildState::BackendExtension,
        )
    }
}

/// Move produced artifact files into the staging directory
///
/// Extension artifacts are prefixed with the extension name so modules
/// producing identically named files cannot clobber each other.
fn collect_artifacts(
    artifacts: &[PathBuf],
    backend_out: &Path,
    prefix: Option<&str>,
    stage: BuildState,
) -> Result<(), PipelineError> {
    for artifact in artifacts {
        let Some(file_name) = artifact.file_name().map(|n| n.to_string_lossy()) else {
            continue;
        };
        let staged_name = match prefix {
            Some(prefix) => format!("{prefix}-{file_name}"),
            None => file_name.into_owned(),
        };
        filesystem::move_path(artifact, &backend_out.join(staged_name))
            .map_err(|source| PipelineError::Filesystem { stage, source })?;
    }
    Ok(())
}
