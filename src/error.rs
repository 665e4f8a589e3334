//! Error types for bundleforge
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::task::BuildState;
use crate::core::validate::ValidationReport;

/// Errors from external toolchain invocations
#[derive(Error, Debug)]
pub enum ToolchainError {
    /// Failed to spawn the external program
    #[error("Failed to run '{program}': {error}")]
    SpawnFailed { program: String, error: String },

    /// Program exited with a non-zero status
    #[error("'{program}' failed in '{dir}': {detail}")]
    StepFailed {
        program: String,
        dir: PathBuf,
        detail: String,
    },

    /// Program exceeded the configured step timeout
    #[error("'{program}' timed out after {seconds}s")]
    TimedOut { program: String, seconds: u64 },

    /// A ref could not be resolved to an immutable commit
    #[error("Failed to resolve '{reference}' in '{repository}': {error}")]
    ResolveFailed {
        repository: String,
        reference: String,
        error: String,
    },

    /// Expected build output was not produced
    #[error("Build in '{dir}' produced no artifacts")]
    NoArtifacts { dir: PathBuf },

    /// IO error around an invocation
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Artifact cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to place an artifact into the cache
    #[error("Failed to store artifact at '{path}': {error}")]
    StoreFailed { path: PathBuf, error: String },

    /// IO error while inspecting or clearing the cache
    #[error("Cache IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to move a file or directory
    #[error("Failed to move '{from}' to '{to}': {error}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// Build pipeline errors
///
/// Every variant carries the stage the pipeline was in; pollers only ever
/// see the terminal `failed` state, detail goes to the log.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An external step failed
    #[error("Stage {stage} failed: {source}")]
    Stage {
        stage: BuildState,
        #[source]
        source: ToolchainError,
    },

    /// Cache write failed after a successful build
    #[error("Stage {stage} failed: {source}")]
    Cache {
        stage: BuildState,
        #[source]
        source: CacheError,
    },

    /// Staging directory manipulation failed
    #[error("Stage {stage} failed: {source}")]
    Filesystem {
        stage: BuildState,
        #[source]
        source: FilesystemError,
    },

    /// The configuration is missing the group's base component
    #[error("Stage {stage} failed: configuration has no {group} base component")]
    MissingBase {
        stage: BuildState,
        group: crate::core::extension::ExtensionGroup,
    },
}

impl PipelineError {
    /// The stage the pipeline was in when it failed
    pub fn stage(&self) -> BuildState {
        match self {
            Self::Stage { stage, .. }
            | Self::Cache { stage, .. }
            | Self::Filesystem { stage, .. }
            | Self::MissingBase { stage, .. } => *stage,
        }
    }
}

/// Errors surfaced by the build service API
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Submitted configuration failed validation; never creates a task
    #[error("Invalid configuration: {report}")]
    InvalidConfiguration { report: ValidationReport },

    /// Requested extension/version is not in the catalog
    #[error("Extension '{name}' (version '{version}') not found in catalog")]
    UnknownExtension { name: String, version: String },

    /// Requested extension exists but is not currently buildable
    #[error("Extension '{name}' (version '{version}') is not active")]
    InactiveExtension { name: String, version: String },

    /// A requested version could not be resolved to a commit
    #[error(transparent)]
    Resolve(#[from] ToolchainError),

    /// No task and no cache entry exist for the token
    #[error("Unknown build token '{token}'")]
    UnknownToken { token: String },

    /// The build exists but has not produced an artifact yet
    #[error("Build '{token}' is not ready (state: {state})")]
    NotReady { token: String, state: BuildState },

    /// The build reached a terminal failure; there is nothing to download
    #[error("Build '{token}' failed; no artifact was produced")]
    Failed { token: String },
}

/// Catalog client errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Network-level request failure
    #[error("Request to '{url}' failed: {error}")]
    RequestFailed { url: String, error: String },

    /// Non-success HTTP status
    #[error("'{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Response could not be parsed
    #[error("Failed to parse response from '{url}': {error}")]
    ParseFailed { url: String, error: String },

    /// Catalog file IO
    #[error("Catalog file error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// Failed to write config file
    #[error("Failed to write config file '{path}': {error}")]
    WriteError { path: PathBuf, error: String },
}

/// Top-level bundleforge error type
#[derive(Error, Debug)]
pub enum BundleforgeError {
    /// Toolchain error
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Pipeline error
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Service error
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Catalog error
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Config error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Generic error
    #[error("{0}")]
    Generic(String),
}
