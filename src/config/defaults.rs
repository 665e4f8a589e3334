//! Default configuration values

/// Default temporary build directory
pub const DEFAULT_TMP_DIR: &str = "./tmp";

/// Default artifact cache directory
pub const DEFAULT_CACHE_DIR: &str = "./cache";

/// Default catalog file location
pub const DEFAULT_CATALOG_PATH: &str = "./extensions.json";

/// Organization whose repositories are scanned for extensions
pub const DEFAULT_ORGANIZATION: &str = "bundleforge";

/// Base frontend repository every bundle includes
pub const DEFAULT_FRONTEND_REPO: &str = "https://github.com/bundleforge/bundleforge-frontend";

/// Base backend repository every bundle includes
pub const DEFAULT_BACKEND_REPO: &str = "https://github.com/bundleforge/bundleforge-backend";

/// Branch used when a version is not a release tag
pub const DEFAULT_BRANCH: &str = "master";

/// Code-hosting API endpoint for catalog assembly
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Timeout applied to every external build invocation (seconds)
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 1800;

/// Maximum number of build pipelines running at once (0 = unbounded)
pub const DEFAULT_MAX_PARALLEL_BUILDS: usize = 2;

/// Maximum catalog fetch attempts per request
pub const MAX_FETCH_RETRIES: u32 = 3;

/// Terminal task states kept queryable after deregistration
pub const MAX_FINISHED_TASKS: usize = 128;
