//! Common test utilities and helpers
//!
//! Provides an in-memory fake toolchain and a service harness wired to
//! temporary directories, so build flows can be exercised without any of
//! the real external tools.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use bundleforge::core::cache::ArtifactCache;
use bundleforge::core::extension::{Catalog, Extension, ExtensionGroup, ExtensionRequest};
use bundleforge::core::service::BuildService;
use bundleforge::error::ToolchainError;
use bundleforge::infra::toolchain::Toolchain;

/// Fake toolchain recording every step it performs
///
/// Steps create marker files so the pipeline's staging logic runs for
/// real; only the external tools are simulated.
pub struct FakeToolchain {
    steps: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
    step_delay: Duration,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(5))
    }

    /// Create a fake whose steps each take `step_delay`
    pub fn with_delay(step_delay: Duration) -> Self {
        Self {
            steps: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
            step_delay,
        }
    }

    /// Make every step whose label contains `needle` fail
    pub fn fail_on(&self, needle: &str) {
        *self.fail_on.lock().unwrap() = Some(needle.to_string());
    }

    /// Stop injecting failures
    pub fn clear_failures(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    /// All recorded step labels, in execution order
    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().unwrap().clone()
    }

    /// Number of recorded pipeline steps, resolution excluded
    pub fn build_step_count(&self) -> usize {
        self.steps
            .lock()
            .unwrap()
            .iter()
            .filter(|label| !label.starts_with("resolve:"))
            .count()
    }

    async fn step(&self, label: String) -> Result<(), ToolchainError> {
        tokio::time::sleep(self.step_delay).await;
        let failing = self
            .fail_on
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|needle| label.contains(needle.as_str()));
        self.steps.lock().unwrap().push(label.clone());
        if failing {
            return Err(ToolchainError::StepFailed {
                program: label,
                dir: PathBuf::from("fake"),
                detail: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for FakeToolchain {
    fn default() -> Self {
        Self::new()
    }
}

fn tail(repository: &str) -> &str {
    repository.trim_end_matches('/').rsplit('/').next().unwrap_or(repository)
}

impl Toolchain for FakeToolchain {
    fn resolve_commit(
        &self,
        repository: &str,
        reference: &str,
    ) -> impl std::future::Future<Output = Result<String, ToolchainError>> + Send {
        let label = format!("resolve:{}:{reference}", tail(repository));
        let commit = format!("commit-{}-{reference}", tail(repository));
        async move {
            self.step(label).await?;
            Ok(commit)
        }
    }

    fn clone_at(
        &self,
        repository: &str,
        commit: &str,
        dest: &Path,
    ) -> impl std::future::Future<Output = Result<(), ToolchainError>> + Send {
        let label = format!("clone:{}", tail(repository));
        let dest = dest.to_path_buf();
        let commit = commit.to_string();
        async move {
            self.step(label).await?;
            std::fs::create_dir_all(&dest).map_err(|e| ToolchainError::IoError {
                path: dest.clone(),
                error: e.to_string(),
            })?;
            std::fs::write(dest.join("HEAD"), commit).map_err(|e| ToolchainError::IoError {
                path: dest.clone(),
                error: e.to_string(),
            })?;
            Ok(())
        }
    }

    fn prepare_frontend(
        &self,
        checkout: &Path,
    ) -> impl std::future::Future<Output = Result<(), ToolchainError>> + Send {
        let label = format!(
            "prepare_frontend:{}",
            checkout.file_name().unwrap_or_default().to_string_lossy()
        );
        async move { self.step(label).await }
    }

    fn install_frontend_extension(
        &self,
        _checkout: &Path,
        repository: &str,
        _commit: &str,
    ) -> impl std::future::Future<Output = Result<(), ToolchainError>> + Send {
        let label = format!("install_frontend_extension:{}", tail(repository));
        async move { self.step(label).await }
    }

    fn build_frontend(
        &self,
        checkout: &Path,
    ) -> impl std::future::Future<Output = Result<PathBuf, ToolchainError>> + Send {
        let label = "build_frontend".to_string();
        let dist = checkout.join("dist");
        async move {
            self.step(label).await?;
            std::fs::create_dir_all(&dist).map_err(|e| ToolchainError::IoError {
                path: dist.clone(),
                error: e.to_string(),
            })?;
            std::fs::write(dist.join("index.html"), "<html></html>").map_err(|e| {
                ToolchainError::IoError {
                    path: dist.clone(),
                    error: e.to_string(),
                }
            })?;
            Ok(dist)
        }
    }

    fn assemble_backend(
        &self,
        checkout: &Path,
    ) -> impl std::future::Future<Output = Result<Vec<PathBuf>, ToolchainError>> + Send {
        let module = checkout
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        let label = format!("assemble:{module}");
        let libs = checkout.join("build").join("libs");
        async move {
            self.step(label).await?;
            std::fs::create_dir_all(&libs).map_err(|e| ToolchainError::IoError {
                path: libs.clone(),
                error: e.to_string(),
            })?;
            let artifact = libs.join(format!("{module}.war"));
            std::fs::write(&artifact, format!("war:{module}")).map_err(|e| {
                ToolchainError::IoError {
                    path: artifact.clone(),
                    error: e.to_string(),
                }
            })?;
            Ok(vec![artifact])
        }
    }

    fn archive(
        &self,
        src_dir: &Path,
        dest: &Path,
    ) -> impl std::future::Future<Output = Result<(), ToolchainError>> + Send {
        let label = "archive".to_string();
        let src_dir = src_dir.to_path_buf();
        let dest = dest.to_path_buf();
        async move {
            self.step(label).await?;
            // Deterministic stand-in for the real archive: the sorted list
            // of staged files
            let mut names: Vec<String> = walkdir_names(&src_dir);
            names.sort();
            std::fs::write(&dest, names.join("\n")).map_err(|e| ToolchainError::IoError {
                path: dest.clone(),
                error: e.to_string(),
            })?;
            Ok(())
        }
    }
}

fn walkdir_names(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return names;
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        names.push(entry.file_name().to_string_lossy().into_owned());
        if path.is_dir() {
            names.extend(walkdir_names(&path));
        }
    }
    names
}

/// One extension catalog entry for tests
pub fn catalog_ext(
    name: &str,
    version: &str,
    requires: &[&str],
    incompatible: &[&str],
) -> Extension {
    let group = if name.starts_with("frontend") {
        ExtensionGroup::Frontend
    } else {
        ExtensionGroup::Backend
    };
    Extension {
        name: name.to_string(),
        version: version.to_string(),
        group,
        repository: format!("https://example.com/acme-{name}"),
        required_extensions: requires.iter().map(ToString::to_string).collect(),
        incompatible_extensions: incompatible.iter().map(ToString::to_string).collect(),
        img_src: None,
        description: None,
        active: true,
        is_base: name == "frontend" || name == "backend",
    }
}

/// A catalog with both bases and a pair of vr extensions
pub fn test_catalog() -> Catalog {
    Catalog {
        frontend: vec![
            catalog_ext("frontend", "master", &["backend"], &[]),
            catalog_ext(
                "frontend-extension-vr",
                "master",
                &["backend", "frontend", "backend-extension-vr"],
                &[],
            ),
        ],
        backend: vec![
            catalog_ext("backend", "master", &["frontend"], &[]),
            catalog_ext(
                "backend-extension-vr",
                "master",
                &["backend", "frontend", "frontend-extension-vr"],
                &[],
            ),
        ],
    }
}

/// Build requests by (name, version)
pub fn requests(entries: &[(&str, &str)]) -> Vec<ExtensionRequest> {
    entries
        .iter()
        .map(|(name, version)| ExtensionRequest {
            name: (*name).to_string(),
            version: (*version).to_string(),
        })
        .collect()
}

/// Service wired to a fake toolchain and temporary directories
pub struct TestHarness {
    pub dir: TempDir,
    pub toolchain: Arc<FakeToolchain>,
    pub service: BuildService<FakeToolchain>,
}

impl TestHarness {
    /// Create a harness over the default test catalog
    pub fn new() -> Self {
        Self::with_catalog(test_catalog())
    }

    /// Create a harness over a custom catalog
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self::with_parts(catalog, Arc::new(FakeToolchain::new()))
    }

    /// Create a harness over a custom catalog and toolchain
    pub fn with_parts(catalog: Catalog, toolchain: Arc<FakeToolchain>) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let service = BuildService::new(
            catalog,
            Arc::clone(&toolchain),
            ArtifactCache::new(dir.path().join("cache")),
            dir.path().join("tmp"),
            0,
        );
        Self {
            dir,
            toolchain,
            service,
        }
    }

    /// Path of the temporary build directory
    pub fn tmp_dir(&self) -> PathBuf {
        self.dir.path().join("tmp")
    }

    /// Path of the cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
