//! Service configuration
//!
//! Reads the service configuration from `bundleforge.toml`. When the file
//! does not exist a default one is generated next to the working directory,
//! so a fresh checkout starts with a usable setup.

pub mod defaults;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Service configuration for bundleforge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Upstream repositories and catalog source
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Build pipeline limits
    #[serde(default)]
    pub build: BuildConfig,
}

/// Filesystem locations used by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Temporary build directory; exclusively owned by the service
    pub tmp_dir: PathBuf,

    /// Storage for finished bundle artifacts, keyed by configuration id
    pub cache_dir: PathBuf,

    /// Location of the persisted extension catalog
    pub catalog_path: PathBuf,
}

/// Upstream repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Organization scanned for extension repositories
    pub organization: String,

    /// Base frontend repository included in every bundle
    pub frontend_repo: String,

    /// Base backend repository included in every bundle
    pub backend_repo: String,

    /// Branch used for versions that are not release tags
    pub default_branch: String,

    /// Code-hosting API endpoint
    pub api_base: String,
}

/// Build pipeline limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Timeout for each external invocation, in seconds
    pub step_timeout_secs: u64,

    /// Number of pipelines allowed to run concurrently (0 = unbounded)
    pub max_parallel_builds: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tmp_dir: PathBuf::from(defaults::DEFAULT_TMP_DIR),
            cache_dir: PathBuf::from(defaults::DEFAULT_CACHE_DIR),
            catalog_path: PathBuf::from(defaults::DEFAULT_CATALOG_PATH),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            organization: defaults::DEFAULT_ORGANIZATION.to_string(),
            frontend_repo: defaults::DEFAULT_FRONTEND_REPO.to_string(),
            backend_repo: defaults::DEFAULT_BACKEND_REPO.to_string(),
            default_branch: defaults::DEFAULT_BRANCH.to_string(),
            api_base: defaults::DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: defaults::DEFAULT_STEP_TIMEOUT_SECS,
            max_parallel_builds: defaults::DEFAULT_MAX_PARALLEL_BUILDS,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            upstream: UpstreamConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load the config file, generating a default one when missing
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;
            return Self::from_toml(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                error: e.to_string(),
            });
        }

        tracing::info!(path = %path.display(), "no config file found, generating defaults");
        let config = Self::default();
        let content = config.to_toml().map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Ok(config)
    }

    /// Per-invocation timeout for external build steps
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.build.step_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_roundtrip() {
        let config = ServiceConfig::default();
        let toml = config.to_toml().unwrap();
        let parsed = ServiceConfig::from_toml(&toml).unwrap();
        assert_eq!(parsed.paths.cache_dir, config.paths.cache_dir);
        assert_eq!(parsed.upstream.organization, config.upstream.organization);
        assert_eq!(parsed.build.step_timeout_secs, config.build.step_timeout_secs);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundleforge.toml");

        let config = ServiceConfig::load_or_create(&path).unwrap();
        assert!(path.exists(), "default config file should be written");
        assert_eq!(config.upstream.default_branch, defaults::DEFAULT_BRANCH);

        // Second load reads the file instead of regenerating it
        let reloaded = ServiceConfig::load_or_create(&path).unwrap();
        assert_eq!(reloaded.build.max_parallel_builds, config.build.max_parallel_builds);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundleforge.toml");
        std::fs::write(&path, "[build]\nstep_timeout_secs = 60\nmax_parallel_builds = 1\n").unwrap();

        let config = ServiceConfig::load_or_create(&path).unwrap();
        assert_eq!(config.build.step_timeout_secs, 60);
        assert_eq!(config.paths.tmp_dir, PathBuf::from(defaults::DEFAULT_TMP_DIR));
    }
}
