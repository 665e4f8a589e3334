//! Artifact cache management
//!
//! Finished bundle archives live at a path derived solely from their
//! configuration id. Artifacts are immutable once placed: a changed
//! extension set always produces a different id and therefore a different
//! file.

use std::path::{Path, PathBuf};

use crate::core::identity::ConfigId;
use crate::error::CacheError;

/// File extension of stored bundle archives
pub const ARTIFACT_EXT: &str = "tar.gz";

/// Cache directory information
#[derive(Debug)]
pub struct CacheInfo {
    /// Cache directory path
    pub path: PathBuf,
    /// Total size in bytes
    pub size_bytes: u64,
    /// Number of cached artifacts
    pub artifact_count: usize,
    /// Whether the cache directory exists
    pub exists: bool,
}

impl CacheInfo {
    /// Format size for display
    pub fn format_size(&self) -> String {
        if self.size_bytes < 1024 {
            format!("{} bytes", self.size_bytes)
        } else if self.size_bytes < 1024 * 1024 {
            format!("{:.1} KB", self.size_bytes as f64 / 1024.0)
        } else if self.size_bytes < 1024 * 1024 * 1024 {
            format!("{:.1} MB", self.size_bytes as f64 / (1024.0 * 1024.0))
        } else {
            format!(
                "{:.1} GB",
                self.size_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
            )
        }
    }
}

/// Cache of finished bundle artifacts, keyed by configuration id
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    /// Create a cache rooted at `root`; the directory is created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical artifact path for a configuration id; pure
    pub fn artifact_path(&self, id: &ConfigId) -> PathBuf {
        self.root.join(format!("{id}.{ARTIFACT_EXT}"))
    }

    /// Whether an artifact exists for this id
    ///
    /// Advisory only: another task may be writing the same id concurrently,
    /// so `false` can be stale by the time the caller acts on it.
    pub fn is_cached(&self, id: &ConfigId) -> bool {
        self.artifact_path(id).is_file()
    }

    /// Move a finished archive into the cache under its id
    ///
    /// The archive is first copied to a hidden partial file inside the
    /// cache directory, then renamed onto the canonical path, so a partial
    /// write is never visible there. A concurrent duplicate for the same id
    /// resolves last-writer-wins; the contents are equivalent by
    /// construction.
    pub fn store(&self, built: &Path, id: &ConfigId) -> Result<PathBuf, CacheError> {
        let target = self.artifact_path(id);

        std::fs::create_dir_all(&self.root).map_err(|e| CacheError::StoreFailed {
            path: self.root.clone(),
            error: e.to_string(),
        })?;

        let partial = self.root.join(format!(".{id}.partial"));
        std::fs::copy(built, &partial).map_err(|e| CacheError::StoreFailed {
            path: partial.clone(),
            error: e.to_string(),
        })?;
        std::fs::rename(&partial, &target).map_err(|e| CacheError::StoreFailed {
            path: target.clone(),
            error: e.to_string(),
        })?;

        tracing::info!(id = %id, path = %target.display(), "artifact cached");
        Ok(target)
    }

    /// Gather size and count information for display
    pub fn info(&self) -> CacheInfo {
        let exists = self.root.exists();
        let mut size_bytes = 0;
        let mut artifact_count = 0;

        if exists {
            for entry in walkdir::WalkDir::new(&self.root)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                artifact_count += 1;
                size_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }

        CacheInfo {
            path: self.root.clone(),
            size_bytes,
            artifact_count,
            exists,
        }
    }

    /// Remove every cached artifact, returning the bytes freed
    pub fn clean(&self) -> Result<u64, CacheError> {
        if !self.root.exists() {
            return Ok(0);
        }
        let freed = self.info().size_bytes;
        std::fs::remove_dir_all(&self.root).map_err(|e| CacheError::IoError {
            path: self.root.clone(),
            error: e.to_string(),
        })?;
        Ok(freed)
    }
}
