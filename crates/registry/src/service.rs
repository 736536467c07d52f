use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::project::{Project, ProjectSnapshot, WatchHandle};
use crate::registry::ProjectRegistry;
use codescout_embeddings::EmbeddingProvider;
use codescout_indexer::{BuildSummary, Indexer, ProjectWatcher};
use codescout_protocol::{
    IndexResponse, ProjectStatusItem, SearchItem, SearchResponse, StatusResponse,
    WatchStartResponse, WatchStopResponse,
};
use codescout_search::HybridSearch;
use codescout_store::{ChunkStore, JsonChunkStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// The coordinator behind every tool call.
///
/// Owns the registry and the shared embedding client, and turns tool
/// requests into builds, queries, and watch lifecycles. All methods take
/// `&self`; the service is shared behind an `Arc` across request tasks.
pub struct SearchService {
    config: ServiceConfig,
    registry: Arc<ProjectRegistry>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SearchService {
    #[must_use]
    pub fn new(config: ServiceConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let registry = Arc::new(ProjectRegistry::new(
            config.cache_dir.clone(),
            config.max_projects,
        ));
        Self {
            config,
            registry,
            embedder,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    /// Search one project, indexing it first if it has never been built.
    pub async fn search(
        &self,
        path: Option<&str>,
        query: &str,
        limit: usize,
        hybrid: bool,
    ) -> Result<SearchResponse> {
        let started = Instant::now();
        let root = self.resolve_target(path)?;
        let project = self.registry.resolve(&root).await?;

        let auto_indexed = match self.ensure_ready(&project).await {
            Ok(built) => built,
            Err(err) => {
                // A stale index beats no answer: keep serving the prior
                // build when the refresh path is what failed.
                let stats = project.stats().await;
                if stats.chunk_count > 0 && !matches!(err, ServiceError::StoreCorruption(_)) {
                    log::warn!(
                        "serving stale index for {} after failed build: {err}",
                        project.root().display()
                    );
                    false
                } else {
                    return Err(err);
                }
            }
        };

        let searcher = HybridSearch::new(project.store(), self.embedder.clone());
        let outcome = searcher.search(query, limit, hybrid).await?;

        let results: Vec<SearchItem> = outcome
            .results
            .into_iter()
            .map(|r| SearchItem {
                file_path: r.file_path,
                start_line: r.start_line,
                end_line: r.end_line,
                content: r.content,
                score: r.score,
                match_type: r.match_kind.as_str().to_string(),
            })
            .collect();

        Ok(SearchResponse {
            project: project.root().display().to_string(),
            count: results.len(),
            results,
            took_ms: started.elapsed().as_millis() as u64,
            auto_indexed,
        })
    }

    /// Build (or refresh) one project's index, joining a build already in
    /// flight instead of starting a second one.
    pub async fn index(&self, path: Option<&str>) -> Result<IndexResponse> {
        let root = self.resolve_target(path)?;
        let project = self.registry.resolve(&root).await?;
        let summary = self.build_project(&project, None).await?;
        log::info!(
            "indexed {}: {} files, {} chunks ({} skipped, {} embedded) in {}ms",
            project.root().display(),
            summary.file_count,
            summary.chunk_count,
            summary.files_skipped,
            summary.files_embedded,
            summary.time_ms
        );

        let snapshot = project.snapshot().await;
        Ok(self.index_response(&snapshot))
    }

    /// Report project states. Never triggers indexing: an untracked path is
    /// inspected on disk only, and does not consume a registry slot.
    pub async fn status(&self, path: Option<&str>) -> Result<StatusResponse> {
        if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
            let root = self.registry.canonicalize(Path::new(path)).await?;
            let item = match self.registry.peek(&root).await? {
                Some(project) => status_item(&project.snapshot().await),
                None => self.untracked_status(&root).await?,
            };
            return Ok(StatusResponse {
                projects: vec![item],
            });
        }

        let mut projects = Vec::new();
        for project in self.registry.list().await {
            projects.push(status_item(&project.snapshot().await));
        }
        Ok(StatusResponse { projects })
    }

    /// Start watching a project, indexing it first so later batches are
    /// incremental. A second start on the same project is a no-op.
    pub async fn watch_start(&self, path: Option<&str>) -> Result<WatchStartResponse> {
        let root = self.resolve_target(path)?;
        let project = self.registry.resolve(&root).await?;
        self.ensure_ready(&project).await?;

        let started = project
            .attach_watch_if_absent(|| self.spawn_watch(&project))
            .await?;
        if started {
            log::info!("watching {} for changes", project.root().display());
        } else {
            log::debug!("{} is already being watched", project.root().display());
        }

        Ok(WatchStartResponse {
            path: project.root().display().to_string(),
            watching: true,
        })
    }

    /// Stop one watch, or every active watch when no path is given.
    pub async fn watch_stop(&self, path: Option<&str>) -> Result<WatchStopResponse> {
        let mut stopped = Vec::new();
        match path.filter(|p| !p.trim().is_empty()) {
            Some(path) => {
                if let Some(project) = self.registry.peek(Path::new(path)).await? {
                    if project.stop_watch().await {
                        stopped.push(project.root().display().to_string());
                    }
                }
            }
            None => {
                for project in self.registry.list().await {
                    if project.stop_watch().await {
                        stopped.push(project.root().display().to_string());
                    }
                }
            }
        }
        if !stopped.is_empty() {
            log::info!("stopped watching {} project(s)", stopped.len());
        }
        Ok(WatchStopResponse {
            stopped: !stopped.is_empty(),
            projects_stopped: stopped,
        })
    }

    /// Index the configured warm paths. Failures are logged, not fatal;
    /// the server still serves whatever did come up.
    pub async fn warm_up(&self) {
        for path in self.config.warm_paths.clone() {
            let display = path.display().to_string();
            log::info!("warming up project at {display}");
            match self.index(Some(&display)).await {
                Ok(_) => {}
                Err(err @ ServiceError::CapacityExceeded { .. }) => {
                    log::warn!("warm-up stopped at {display}: {err}");
                    break;
                }
                Err(err) => log::warn!("warm-up of {display} failed: {err}"),
            }
        }
    }

    /// Stop all watchers. Safe to call more than once.
    pub async fn shutdown(&self) {
        let response = self.watch_stop(None).await;
        if let Ok(response) = response {
            if response.stopped {
                log::info!("shutdown stopped {} watcher(s)", response.projects_stopped.len());
            }
        }
    }

    fn resolve_target(&self, path: Option<&str>) -> Result<PathBuf> {
        match path.filter(|p| !p.trim().is_empty()) {
            Some(path) => Ok(PathBuf::from(path)),
            None => self.config.default_path.clone().ok_or_else(|| {
                ServiceError::NotIndexed(
                    "no project path given and no default configured; pass `path` or set \
                     CODESCOUT_DEFAULT_PATH"
                        .to_string(),
                )
            }),
        }
    }

    /// Build the project unless it already holds a usable index. Returns
    /// whether this call ran (or joined) a build.
    async fn ensure_ready(&self, project: &Arc<Project>) -> Result<bool> {
        if project.is_ready().await {
            return Ok(false);
        }
        self.build_project(project, None).await?;
        Ok(true)
    }

    /// Single-flight entry point for full builds and watch refreshes.
    async fn build_project(
        &self,
        project: &Arc<Project>,
        changed: Option<Vec<PathBuf>>,
    ) -> Result<BuildSummary> {
        let indexer = Indexer::new(project.root(), project.store(), self.embedder.clone())
            .map_err(ServiceError::from)?;
        project
            .run_build(|| async move {
                let built = match &changed {
                    None => indexer.build_full().await,
                    Some(paths) => indexer.refresh_paths(paths).await,
                };
                built.map_err(ServiceError::from)
            })
            .await
    }

    /// Start the notify backend and the refresh loop for one project.
    fn spawn_watch(&self, project: &Arc<Project>) -> Result<WatchHandle> {
        let (watcher, mut batches) =
            ProjectWatcher::start(project.root(), self.config.watcher.clone())
                .map_err(ServiceError::from)?;

        let task_project = project.clone();
        let embedder = self.embedder.clone();
        let task = tokio::spawn(async move {
            while let Some(batch) = batches.recv().await {
                log::info!(
                    "refreshing {} changed path(s) under {}",
                    batch.len(),
                    task_project.root().display()
                );
                let indexer = match Indexer::new(
                    task_project.root(),
                    task_project.store(),
                    embedder.clone(),
                ) {
                    Ok(indexer) => indexer,
                    Err(err) => {
                        log::warn!("watch refresh skipped: {err}");
                        continue;
                    }
                };
                let outcome = task_project
                    .run_build(|| async {
                        indexer
                            .refresh_paths(&batch)
                            .await
                            .map_err(ServiceError::from)
                    })
                    .await;
                if let Err(err) = outcome {
                    log::warn!(
                        "watch refresh for {} failed: {err}",
                        task_project.root().display()
                    );
                }
            }
        });

        Ok(WatchHandle {
            watcher,
            _task: task,
        })
    }

    async fn untracked_status(&self, root: &Path) -> Result<ProjectStatusItem> {
        // Peeking at an on-disk store must not admit the project; open it
        // ephemerally just to read the manifest counters.
        let (state, stats, last_error) = if self.registry.store_exists(root) {
            let store = JsonChunkStore::open_for_project(self.registry.cache_root(), root)
                .await
                .map_err(ServiceError::from)?;
            match store.corruption() {
                Some(reason) => (
                    "error",
                    Default::default(),
                    Some(ServiceError::StoreCorruption(reason).to_string()),
                ),
                None => {
                    let stats = store.stats().await.map_err(ServiceError::from)?;
                    let state = if stats.file_count > 0 {
                        "ready"
                    } else {
                        "uninitialized"
                    };
                    (state, stats, None)
                }
            }
        } else {
            ("uninitialized", Default::default(), None)
        };

        Ok(ProjectStatusItem {
            path: root.display().to_string(),
            state: state.to_string(),
            file_count: stats.file_count,
            chunk_count: stats.chunk_count,
            last_updated_ms: stats.last_updated_ms,
            watching: false,
            last_error,
        })
    }

    fn index_response(&self, snapshot: &ProjectSnapshot) -> IndexResponse {
        let usage = self.embedder.usage();
        IndexResponse {
            path: snapshot.root.display().to_string(),
            state: snapshot.status.as_str().to_string(),
            file_count: snapshot.stats.file_count,
            chunk_count: snapshot.stats.chunk_count,
            last_updated_ms: snapshot.stats.last_updated_ms,
            total_tokens_used: usage.total_tokens,
            estimated_cost_usd: usage.estimated_cost_usd,
        }
    }
}

fn status_item(snapshot: &ProjectSnapshot) -> ProjectStatusItem {
    ProjectStatusItem {
        path: snapshot.root.display().to_string(),
        state: snapshot.status.as_str().to_string(),
        file_count: snapshot.stats.file_count,
        chunk_count: snapshot.stats.chunk_count,
        last_updated_ms: snapshot.stats.last_updated_ms,
        watching: snapshot.watching,
        last_error: snapshot.last_error.clone(),
    }
}
