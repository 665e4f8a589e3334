//! Build service surface
//!
//! Ties the catalog, validator, resolver, and task registry together into
//! the submit / status / download API consumed by request-handling layers.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;

use crate::core::cache::ArtifactCache;
use crate::core::extension::{Catalog, Configuration, ExtensionRequest, ResolvedExtension};
use crate::core::identity::ConfigId;
use crate::core::task::{BuildState, Submission, TaskRegistry};
use crate::core::validate::validate;
use crate::error::{ServiceError, ToolchainError};
use crate::infra::toolchain::Toolchain;

/// Orchestrates build requests against one catalog and one cache
pub struct BuildService<T: Toolchain> {
    catalog: Catalog,
    toolchain: Arc<T>,
    registry: Arc<TaskRegistry<T>>,
}

impl<T: Toolchain> BuildService<T> {
    /// Create a service
    pub fn new(
        catalog: Catalog,
        toolchain: Arc<T>,
        cache: ArtifactCache,
        tmp_dir: PathBuf,
        max_parallel_builds: usize,
    ) -> Self {
        let registry = TaskRegistry::new(
            Arc::clone(&toolchain),
            cache,
            tmp_dir,
            max_parallel_builds,
        );
        Self {
            catalog,
            toolchain,
            registry,
        }
    }

    /// The catalog this service validates against
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Submit a configuration for building
    ///
    /// Rejected synchronously on validation failure, before any external
    /// work; a rejected submission never creates a task. Otherwise every
    /// requested version is resolved to an immutable commit, the canonical
    /// id is computed, and the registry decides between cache hit,
    /// attaching to an in-flight build, and starting a new one.
    pub async fn submit(
        &self,
        requests: &[ExtensionRequest],
    ) -> Result<Submission, ServiceError> {
        let mut wanted = Vec::with_capacity(requests.len());
        for request in requests {
            let extension = self
                .catalog
                .lookup(&request.name, &request.version)
                .ok_or_else(|| ServiceError::UnknownExtension {
                    name: request.name.clone(),
                    version: request.version.clone(),
                })?;
            if !extension.active {
                return Err(ServiceError::InactiveExtension {
                    name: request.name.clone(),
                    version: request.version.clone(),
                });
            }
            wanted.push(extension.clone());
        }

        let report = validate(&wanted, &self.catalog);
        if !report.is_valid() {
            tracing::debug!(report = %report, "configuration rejected");
            return Err(ServiceError::InvalidConfiguration { report });
        }

        // Branch names are mutable; hash only resolved commits
        let resolutions = wanted.iter().map(|extension| async move {
            let commit = self
                .toolchain
                .resolve_commit(&extension.repository, &extension.version)
                .await?;
            Ok::<ResolvedExtension, ToolchainError>(ResolvedExtension {
                name: extension.name.clone(),
                version: extension.version.clone(),
                commit,
                group: extension.group,
                repository: extension.repository.clone(),
                is_base: extension.is_base,
            })
        });
        let resolved = try_join_all(resolutions).await?;

        Ok(self.registry.get_or_create(Configuration::new(resolved)))
    }

    /// Current pipeline state for a token, `None` for an unknown token
    pub fn status(&self, token: &ConfigId) -> Option<BuildState> {
        self.registry.status(token)
    }

    /// Path of the finished artifact for a token
    pub fn download(&self, token: &ConfigId) -> Result<PathBuf, ServiceError> {
        let cache = self.registry.cache();
        if cache.is_cached(token) {
            return Ok(cache.artifact_path(token));
        }
        match self.registry.status(token) {
            Some(BuildState::Failed) => Err(ServiceError::Failed {
                token: token.to_string(),
            }),
            Some(state) => Err(ServiceError::NotReady {
                token: token.to_string(),
                state,
            }),
            None => Err(ServiceError::UnknownToken {
                token: token.to_string(),
            }),
        }
    }

    /// Number of builds currently registered as in flight
    pub fn in_flight(&self) -> usize {
        self.registry.in_flight()
    }
}
