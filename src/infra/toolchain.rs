//! External build toolchain
//!
//! The [`Toolchain`] trait is the seam between the orchestration core and
//! the external tools it drives. The production implementation shells out
//! to `git`, `npm`, `ember`, `gradle`, and `tar`; tests substitute an
//! in-memory implementation.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ToolchainError;
use crate::infra::command;

/// External tools the production toolchain depends on
pub const REQUIRED_TOOLS: &[&str] = &["git", "npm", "ember", "gradle", "tar"];

/// Check whether an external tool is installed
pub fn is_tool_available(name: &str) -> bool {
    which::which(name).is_ok()
}

/// External build collaborators consumed by the pipeline
///
/// Every method is one opaque, potentially failing, asynchronous external
/// step. Implementations must be safe to call from concurrently running
/// pipelines.
pub trait Toolchain: Send + Sync + 'static {
    /// Resolve a branch or tag to an immutable commit
    fn resolve_commit(
        &self,
        repository: &str,
        reference: &str,
    ) -> impl Future<Output = Result<String, ToolchainError>> + Send;

    /// Clone a repository and check out a specific commit
    fn clone_at(
        &self,
        repository: &str,
        commit: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<(), ToolchainError>> + Send;

    /// Install the frontend checkout's package dependencies
    fn prepare_frontend(
        &self,
        checkout: &Path,
    ) -> impl Future<Output = Result<(), ToolchainError>> + Send;

    /// Install one frontend extension into the checkout
    fn install_frontend_extension(
        &self,
        checkout: &Path,
        repository: &str,
        commit: &str,
    ) -> impl Future<Output = Result<(), ToolchainError>> + Send;

    /// Produce the production frontend bundle; returns the bundle directory
    fn build_frontend(
        &self,
        checkout: &Path,
    ) -> impl Future<Output = Result<PathBuf, ToolchainError>> + Send;

    /// Assemble a backend module; returns the produced artifact files
    fn assemble_backend(
        &self,
        checkout: &Path,
    ) -> impl Future<Output = Result<Vec<PathBuf>, ToolchainError>> + Send;

    /// Archive a staging directory into a single artifact file
    fn archive(
        &self,
        src_dir: &Path,
        dest: &Path,
    ) -> impl Future<Output = Result<(), ToolchainError>> + Send;
}

/// Production toolchain invoking external processes
#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    /// Timeout applied to each invocation
    step_timeout: Duration,
}

impl ProcessToolchain {
    /// Create a toolchain with the given per-step timeout
    pub fn new(step_timeout: Duration) -> Self {
        Self { step_timeout }
    }
}

fn is_commit_sha(reference: &str) -> bool {
    reference.len() == 40 && reference.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Pick the commit out of `git ls-remote` output, preferring peeled tags
fn parse_ls_remote(stdout: &str) -> Option<String> {
    let mut first = None;
    for line in stdout.lines() {
        let mut fields = line.split_whitespace();
        let (Some(sha), Some(name)) = (fields.next(), fields.next()) else {
            continue;
        };
        // An annotated tag lists the tag object and a `^{}` line with the
        // commit it points at; the commit is the one we want.
        if name.ends_with("^{}") {
            return Some(sha.to_string());
        }
        if first.is_none() {
            first = Some(sha.to_string());
        }
    }
    first
}

impl Toolchain for ProcessToolchain {
    fn resolve_commit(
        &self,
        repository: &str,
        reference: &str,
    ) -> impl Future<Output = Result<String, ToolchainError>> + Send {
        async move {
            if is_commit_sha(reference) {
                return Ok(reference.to_string());
            }

            let workdir = std::env::temp_dir();
            let output = command::run(
                "git",
                &["ls-remote", repository, reference],
                &workdir,
                self.step_timeout,
            )
            .await
            .map_err(|e| ToolchainError::ResolveFailed {
                repository: repository.to_string(),
                reference: reference.to_string(),
                error: e.to_string(),
            })?;

            let stdout = String::from_utf8_lossy(&output.stdout);
            parse_ls_remote(&stdout).ok_or_else(|| ToolchainError::ResolveFailed {
                repository: repository.to_string(),
                reference: reference.to_string(),
                error: "no matching ref".to_string(),
            })
        }
    }

    fn clone_at(
        &self,
        repository: &str,
        commit: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<(), ToolchainError>> + Send {
        async move {
            let parent = dest.parent().unwrap_or(Path::new("."));
            let dest_name = dest
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| ".".to_string());

            command::run(
                "git",
                &["clone", repository, &dest_name],
                parent,
                self.step_timeout,
            )
            .await?;
            command::run(
                "git",
                &["checkout", "--detach", commit],
                dest,
                self.step_timeout,
            )
            .await?;
            Ok(())
        }
    }

    fn prepare_frontend(
        &self,
        checkout: &Path,
    ) -> impl Future<Output = Result<(), ToolchainError>> + Send {
        async move {
            command::run("npm", &["install"], checkout, self.step_timeout).await?;
            Ok(())
        }
    }

    fn install_frontend_extension(
        &self,
        checkout: &Path,
        repository: &str,
        commit: &str,
    ) -> impl Future<Output = Result<(), ToolchainError>> + Send {
        async move {
            let spec = format!("{repository}#{commit}");
            command::run("ember", &["install", &spec], checkout, self.step_timeout).await?;
            Ok(())
        }
    }

    fn build_frontend(
        &self,
        checkout: &Path,
    ) -> impl Future<Output = Result<PathBuf, ToolchainError>> + Send {
        async move {
            command::run(
                "ember",
                &["build", "--environment", "production"],
                checkout,
                self.step_timeout,
            )
            .await?;
            Ok(checkout.join("dist"))
        }
    }

    fn assemble_backend(
        &self,
        checkout: &Path,
    ) -> impl Future<Output = Result<Vec<PathBuf>, ToolchainError>> + Send {
        async move {
            command::run("gradle", &["assemble"], checkout, self.step_timeout).await?;

            // Gradle drops its deployable outputs under build/libs
            let libs = checkout.join("build").join("libs");
            let mut artifacts: Vec<PathBuf> = walkdir::WalkDir::new(&libs)
                .max_depth(1)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(|e| e.path().to_path_buf())
                .filter(|p| {
                    matches!(
                        p.extension().and_then(|e| e.to_str()),
                        Some("war" | "jar")
                    )
                })
                .collect();
            artifacts.sort();

            if artifacts.is_empty() {
                return Err(ToolchainError::NoArtifacts {
                    dir: checkout.to_path_buf(),
                });
            }
            Ok(artifacts)
        }
    }

    fn archive(
        &self,
        src_dir: &Path,
        dest: &Path,
    ) -> impl Future<Output = Result<(), ToolchainError>> + Send {
        async move {
            let dest_str = dest.to_string_lossy().into_owned();
            let src_str = src_dir.to_string_lossy().into_owned();
            let workdir = src_dir.parent().unwrap_or(Path::new("."));
            command::run(
                "tar",
                &["-czf", &dest_str, "-C", &src_str, "."],
                workdir,
                self.step_timeout,
            )
            .await?;
            Ok(())
        }
    }
}
