//! Build tasks and the in-flight registry
//!
//! A [`BuildTask`] tracks one in-flight (or terminal) build for one
//! configuration id. The [`TaskRegistry`] owns the id → task map and
//! guarantees that at most one pipeline execution is ever in flight per
//! distinct id, regardless of how many callers request it concurrently.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{watch, Semaphore};

use crate::config::defaults::MAX_FINISHED_TASKS;
use crate::core::cache::ArtifactCache;
use crate::core::extension::Configuration;
use crate::core::identity::ConfigId;
use crate::core::pipeline::BuildPipeline;
use crate::infra::toolchain::Toolchain;

/// Pipeline stage of one build
///
/// Entered strictly in order; `Failed` is reachable from every non-terminal
/// state. `Ready` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    /// Task registered, pipeline not yet running
    Init,
    /// Cloning the frontend base and installing its dependencies
    FrontendPrepare,
    /// Installing selected frontend extensions into the checkout
    FrontendExtension,
    /// Producing the production frontend bundle
    Frontend,
    /// Cloning the backend base
    BackendPrepare,
    /// Assembling the backend module
    Backend,
    /// Assembling selected backend extensions
    BackendExtension,
    /// Archiving the staging directory and moving it into the cache
    Packing,
    /// Artifact available in the cache
    Ready,
    /// Pipeline aborted; no artifact was produced
    Failed,
}

impl BuildState {
    /// Whether no further transition can occur
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::FrontendPrepare => "frontend_prepare",
            Self::FrontendExtension => "frontend_extension",
            Self::Frontend => "frontend",
            Self::BackendPrepare => "backend_prepare",
            Self::Backend => "backend",
            Self::BackendExtension => "backend_extension",
            Self::Packing => "packing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One in-flight (or terminal) build for one configuration id
#[derive(Debug)]
pub struct BuildTask {
    id: ConfigId,
    configuration: Configuration,
    state: watch::Sender<BuildState>,
}

impl BuildTask {
    fn new(id: ConfigId, configuration: Configuration) -> Arc<Self> {
        let (state, _) = watch::channel(BuildState::Init);
        Arc::new(Self {
            id,
            configuration,
            state,
        })
    }

    /// Opaque handle used to poll status and request the download
    pub fn token(&self) -> &ConfigId {
        &self.id
    }

    /// The resolved configuration driving this build
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Current pipeline state; safe to query at any time
    pub fn status(&self) -> BuildState {
        *self.state.borrow()
    }

    /// Observe state transitions as they happen
    pub fn subscribe(&self) -> watch::Receiver<BuildState> {
        self.state.subscribe()
    }

    /// Wait until the task reaches `Ready` or `Failed`
    pub async fn wait_terminal(&self) -> BuildState {
        let mut rx = self.subscribe();
        match rx.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            // Sender lives in self, so this only races task teardown
            Err(_) => self.status(),
        }
    }

    pub(crate) fn advance(&self, state: BuildState) {
        tracing::info!(id = %self.id, state = %state, "build state transition");
        self.state.send_replace(state);
    }
}

/// Outcome of submitting a configuration
#[derive(Debug, Clone)]
pub enum Submission {
    /// An artifact for this id already exists; no task was created
    Cached(ConfigId),
    /// A build for this id is already in flight; caller attached to it
    Existing(Arc<BuildTask>),
    /// A new task was registered and its pipeline launched
    Started(Arc<BuildTask>),
}

impl Submission {
    /// The token identifying this configuration
    pub fn token(&self) -> &ConfigId {
        match self {
            Self::Cached(id) => id,
            Self::Existing(task) | Self::Started(task) => task.token(),
        }
    }

    /// The underlying task, when one exists
    pub fn task(&self) -> Option<&Arc<BuildTask>> {
        match self {
            Self::Cached(_) => None,
            Self::Existing(task) | Self::Started(task) => Some(task),
        }
    }
}

struct RegistryInner {
    /// In-flight tasks by configuration id
    active: HashMap<ConfigId, Arc<BuildTask>>,
    /// Terminal states kept queryable after deregistration
    finished: HashMap<ConfigId, BuildState>,
    /// Eviction order for `finished`
    finished_order: VecDeque<ConfigId>,
}

/// Owner of the in-flight task map
///
/// `get_or_create` performs its check-then-insert under a mutex, which is
/// what preserves the at-most-one-build-per-id guarantee under concurrent
/// submissions. The lock is never held across an await point.
pub struct TaskRegistry<T: Toolchain> {
    toolchain: Arc<T>,
    cache: ArtifactCache,
    tmp_dir: PathBuf,
    running: Option<Arc<Semaphore>>,
    inner: Mutex<RegistryInner>,
}

impl<T: Toolchain> TaskRegistry<T> {
    /// Create a registry
    ///
    /// `max_parallel_builds` bounds concurrently *running* pipelines;
    /// queued tasks stay registered in `Init`. Zero disables the bound.
    pub fn new(
        toolchain: Arc<T>,
        cache: ArtifactCache,
        tmp_dir: PathBuf,
        max_parallel_builds: usize,
    ) -> Arc<Self> {
        let running = (max_parallel_builds > 0)
            .then(|| Arc::new(Semaphore::new(max_parallel_builds)));
        Arc::new(Self {
            toolchain,
            cache,
            tmp_dir,
            running,
            inner: Mutex::new(RegistryInner {
                active: HashMap::new(),
                finished: HashMap::new(),
                finished_order: VecDeque::new(),
            }),
        })
    }

    /// The artifact cache this registry stores into
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The only entry point for starting or attaching to a build
    ///
    /// Exactly one of three things happens, atomically with respect to
    /// other submissions: the caller attaches to an in-flight task, the
    /// cached artifact is reported, or a new task is registered and its
    /// pipeline spawned.
    pub fn get_or_create(self: &Arc<Self>, configuration: Configuration) -> Submission {
        let id = configuration.id();

        let task = {
            let mut inner = self.lock();
            if let Some(task) = inner.active.get(&id) {
                tracing::debug!(id = %id, "attached to in-flight build");
                return Submission::Existing(Arc::clone(task));
            }
            if self.cache.is_cached(&id) {
                tracing::debug!(id = %id, "cache hit, no build needed");
                return Submission::Cached(id);
            }

            let task = BuildTask::new(id.clone(), configuration);
            inner.active.insert(id.clone(), Arc::clone(&task));
            // A resubmission after failure starts from scratch
            inner.finished.remove(&id);
            inner.finished_order.retain(|old| old != &id);
            task
        };

        tracing::info!(id = %id, "build task registered");
        self.spawn(Arc::clone(&task));
        Submission::Started(task)
    }

    /// Current state for a token, or `None` for an unknown token
    pub fn status(&self, id: &ConfigId) -> Option<BuildState> {
        {
            let inner = self.lock();
            if let Some(task) = inner.active.get(id) {
                return Some(task.status());
            }
            if let Some(state) = inner.finished.get(id) {
                return Some(*state);
            }
        }
        self.cache.is_cached(id).then_some(BuildState::Ready)
    }

    /// Number of registered in-flight tasks
    pub fn in_flight(&self) -> usize {
        self.lock().active.len()
    }

    fn spawn(self: &Arc<Self>, task: Arc<BuildTask>) {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let _permit = match &registry.running {
                Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
                None => None,
            };

            let pipeline = BuildPipeline::new(
                registry.toolchain.as_ref(),
                &registry.cache,
                &registry.tmp_dir,
            );
            let terminal = match pipeline.run(task.as_ref()).await {
                Ok(artifact) => {
                    tracing::info!(
                        id = %task.token(),
                        artifact = %artifact.display(),
                        "build finished"
                    );
                    BuildState::Ready
                }
                Err(error) => {
                    tracing::error!(
                        id = %task.token(),
                        stage = %error.stage(),
                        error = %error,
                        "build failed"
                    );
                    BuildState::Failed
                }
            };

            // Deregister first: anyone woken by the terminal transition
            // must already observe the registry's post-build state.
            registry.finish(task.token(), terminal);
            task.advance(terminal);
        });
    }

    /// Deregister a terminal task, retaining its state for late pollers
    fn finish(&self, id: &ConfigId, state: BuildState) {
        let mut inner = self.lock();
        inner.active.remove(id);
        if inner.finished.insert(id.clone(), state).is_none() {
            inner.finished_order.push_back(id.clone());
        }
        while inner.finished_order.len() > MAX_FINISHED_TASKS {
            if let Some(evicted) = inner.finished_order.pop_front() {
                inner.finished.remove(&evicted);
            }
        }
    }
}
