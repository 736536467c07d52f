use crate::error::{Result, ServiceError};
use codescout_indexer::{BuildSummary, ProjectWatcher};
use codescout_store::{ChunkStore, StoreStats};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Lifecycle of one tracked project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    /// Registered but never successfully indexed.
    Uninitialized,
    /// A build or refresh is in flight.
    Indexing,
    /// The store holds a usable index.
    Ready,
    /// The last build failed and no prior index exists.
    Error,
}

impl ProjectStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Indexing => "indexing",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

/// Terminal result of one build, shared with every request that joined it.
pub type BuildOutcome = std::result::Result<BuildSummary, ServiceError>;

pub(crate) struct WatchHandle {
    pub watcher: ProjectWatcher,
    /// Refresh loop; exits on its own once the watcher shuts down.
    pub _task: JoinHandle<()>,
}

struct InFlight {
    id: u64,
    rx: watch::Receiver<Option<BuildOutcome>>,
}

struct ProjectState {
    status: ProjectStatus,
    stats: StoreStats,
    last_error: Option<String>,
    build: Option<InFlight>,
    watch: Option<WatchHandle>,
}

/// Read-only view of a project's state for status reporting.
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    pub root: PathBuf,
    pub status: ProjectStatus,
    pub stats: StoreStats,
    pub last_error: Option<String>,
    pub watching: bool,
}

/// One tracked project: its canonical root, its store, and build state.
///
/// Builds are single-flight. The first caller to start one becomes the
/// leader and drives it to completion; everyone else arriving in the
/// meantime awaits the same outcome over a watch channel, so a burst of
/// requests against a cold project costs exactly one indexing pass.
pub struct Project {
    root: PathBuf,
    store: Arc<dyn ChunkStore>,
    state: Mutex<ProjectState>,
    build_seq: AtomicU64,
}

impl Project {
    pub(crate) fn new(
        root: PathBuf,
        store: Arc<dyn ChunkStore>,
        stats: StoreStats,
        last_error: Option<String>,
    ) -> Self {
        let status = if stats.file_count > 0 {
            ProjectStatus::Ready
        } else {
            ProjectStatus::Uninitialized
        };
        Self {
            root,
            store,
            state: Mutex::new(ProjectState {
                status,
                stats,
                last_error,
                build: None,
                watch: None,
            }),
            build_seq: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn ChunkStore> {
        self.store.clone()
    }

    pub async fn snapshot(&self) -> ProjectSnapshot {
        let state = self.state.lock().await;
        ProjectSnapshot {
            root: self.root.clone(),
            status: state.status,
            stats: state.stats,
            last_error: state.last_error.clone(),
            watching: state.watch.is_some(),
        }
    }

    pub async fn is_ready(&self) -> bool {
        let state = self.state.lock().await;
        state.status == ProjectStatus::Ready && state.build.is_none()
    }

    pub async fn stats(&self) -> StoreStats {
        self.state.lock().await.stats
    }

    pub async fn is_watching(&self) -> bool {
        self.state.lock().await.watch.is_some()
    }

    /// Run `work` as a single-flight build, or join one already in flight.
    ///
    /// On success the project becomes `Ready` with the summary's counters.
    /// On failure the error is recorded; a project with a prior good index
    /// stays `Ready` and keeps serving it, otherwise it lands in `Error`.
    pub(crate) async fn run_build<F, Fut>(&self, work: F) -> BuildOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BuildOutcome>,
    {
        let (tx, build_id) = {
            let mut state = self.state.lock().await;
            if let Some(in_flight) = &state.build {
                let rx = in_flight.rx.clone();
                let stale_id = in_flight.id;
                drop(state);
                return self.join_build(rx, stale_id).await;
            }
            let (tx, rx) = watch::channel(None);
            let id = self.build_seq.fetch_add(1, Ordering::Relaxed);
            state.build = Some(InFlight { id, rx });
            state.status = ProjectStatus::Indexing;
            (tx, id)
        };

        let outcome = work().await;

        {
            let mut state = self.state.lock().await;
            if state.build.as_ref().map(|b| b.id) == Some(build_id) {
                state.build = None;
            }
            match &outcome {
                Ok(summary) => {
                    state.status = ProjectStatus::Ready;
                    state.stats = StoreStats {
                        file_count: summary.file_count,
                        chunk_count: summary.chunk_count,
                        last_updated_ms: Some(now_ms()),
                    };
                    state.last_error = None;
                }
                Err(err) => {
                    state.status = if state.stats.chunk_count > 0 {
                        ProjectStatus::Ready
                    } else {
                        ProjectStatus::Error
                    };
                    state.last_error = Some(err.to_string());
                    log::warn!("index build for {} failed: {err}", self.root.display());
                }
            }
        }

        let _ = tx.send(Some(outcome.clone()));
        outcome
    }

    async fn join_build(
        &self,
        mut rx: watch::Receiver<Option<BuildOutcome>>,
        build_id: u64,
    ) -> BuildOutcome {
        log::debug!("joining in-flight build for {}", self.root.display());
        loop {
            {
                let current = rx.borrow_and_update();
                if let Some(outcome) = current.as_ref() {
                    return outcome.clone();
                }
            }
            if rx.changed().await.is_err() {
                // Leader dropped without publishing. Clear the stale slot
                // so the next caller can start fresh.
                let mut state = self.state.lock().await;
                if state.build.as_ref().map(|b| b.id) == Some(build_id) {
                    state.build = None;
                    state.status = ProjectStatus::Error;
                }
                return Err(ServiceError::Internal(
                    "index build was interrupted".to_string(),
                ));
            }
        }
    }

    /// Attach a watch handle unless one is already active. The closure only
    /// runs when the slot is free; returns whether a new watch was started.
    pub(crate) async fn attach_watch_if_absent<F>(&self, make: F) -> Result<bool>
    where
        F: FnOnce() -> Result<WatchHandle>,
    {
        let mut state = self.state.lock().await;
        if state.watch.is_some() {
            return Ok(false);
        }
        state.watch = Some(make()?);
        Ok(true)
    }

    /// Stop watching, if active. Returns whether a watch was stopped.
    pub(crate) async fn stop_watch(&self) -> bool {
        let handle = self.state.lock().await.watch.take();
        match handle {
            Some(handle) => {
                handle.watcher.shutdown().await;
                true
            }
            None => false,
        }
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
