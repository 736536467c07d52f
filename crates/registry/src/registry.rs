use crate::error::{Result, ServiceError};
use crate::project::Project;
use codescout_store::{store_dir_for_project, ChunkStore, JsonChunkStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tracked projects for this process, bounded by a capacity limit.
///
/// Entries keep insertion order for status listings. A project admitted
/// here holds its store open for the life of the process; capacity is a
/// guard against unbounded memory, so lookups of already-tracked paths
/// never fail on it.
pub struct ProjectRegistry {
    cache_root: PathBuf,
    max_projects: usize,
    projects: Mutex<Vec<Arc<Project>>>,
}

impl ProjectRegistry {
    #[must_use]
    pub fn new(cache_root: PathBuf, max_projects: usize) -> Self {
        Self {
            cache_root,
            max_projects,
            projects: Mutex::new(Vec::new()),
        }
    }

    /// Canonicalize `path`, requiring an existing directory.
    pub async fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let canonical = tokio::fs::canonicalize(path).await.map_err(|err| {
            ServiceError::InvalidPath(format!("{}: {err}", path.display()))
        })?;
        let meta = tokio::fs::metadata(&canonical).await.map_err(|err| {
            ServiceError::InvalidPath(format!("{}: {err}", canonical.display()))
        })?;
        if !meta.is_dir() {
            return Err(ServiceError::InvalidPath(format!(
                "{} is not a directory",
                canonical.display()
            )));
        }
        Ok(canonical)
    }

    /// Return the tracked project for `path`, admitting it if new.
    ///
    /// Admission opens (or reattaches) the on-disk store; a store whose
    /// manifest already lists files comes back `Ready` without re-indexing.
    pub async fn resolve(&self, path: &Path) -> Result<Arc<Project>> {
        let root = self.canonicalize(path).await?;
        let mut projects = self.projects.lock().await;
        if let Some(existing) = projects.iter().find(|p| p.root() == root) {
            return Ok(existing.clone());
        }

        if projects.len() >= self.max_projects {
            return Err(ServiceError::CapacityExceeded {
                active: projects.len(),
                limit: self.max_projects,
            });
        }

        let store = JsonChunkStore::open_for_project(&self.cache_root, &root)
            .await
            .map_err(ServiceError::from)?;
        // Corrupt store data is recoverable: the entry is admitted with the
        // corruption recorded, and the next build clears and rebuilds it.
        let last_error = store
            .corruption()
            .map(|reason| ServiceError::StoreCorruption(reason).to_string());
        let stats = store.stats().await.map_err(ServiceError::from)?;

        if stats.file_count > 0 {
            log::info!(
                "reattached existing index for {} ({} files, {} chunks)",
                root.display(),
                stats.file_count,
                stats.chunk_count
            );
        }

        let project = Arc::new(Project::new(root, Arc::new(store), stats, last_error));
        projects.push(project.clone());

        let active = projects.len();
        if active * 5 >= self.max_projects * 4 {
            log::warn!(
                "project registry at {active}/{} slots; older projects persist on disk but \
                 new ones will be rejected at the limit",
                self.max_projects
            );
        }
        Ok(project)
    }

    /// Look up a tracked project without admitting it.
    pub async fn peek(&self, path: &Path) -> Result<Option<Arc<Project>>> {
        let root = self.canonicalize(path).await?;
        let projects = self.projects.lock().await;
        Ok(projects.iter().find(|p| p.root() == root).cloned())
    }

    /// Whether an on-disk store exists for `root`, without opening it.
    #[must_use]
    pub fn store_exists(&self, root: &Path) -> bool {
        store_dir_for_project(&self.cache_root, root)
            .join("manifest.json")
            .is_file()
    }

    #[must_use]
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub async fn list(&self) -> Vec<Arc<Project>> {
        self.projects.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn registry(cache: &TempDir, limit: usize) -> ProjectRegistry {
        ProjectRegistry::new(cache.path().to_path_buf(), limit)
    }

    #[tokio::test]
    async fn resolve_is_idempotent_per_path() {
        let cache = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();
        let registry = registry(&cache, 4);

        let first = registry.resolve(project_dir.path()).await.unwrap();
        let second = registry.resolve(project_dir.path()).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn capacity_rejects_new_paths_but_not_tracked_ones() {
        let cache = TempDir::new().unwrap();
        let registry = registry(&cache, 2);

        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let c = TempDir::new().unwrap();
        registry.resolve(a.path()).await.unwrap();
        registry.resolve(b.path()).await.unwrap();

        let err = registry.resolve(c.path()).await.err().unwrap();
        assert_eq!(
            err,
            ServiceError::CapacityExceeded {
                active: 2,
                limit: 2
            }
        );

        // Already-tracked paths still resolve at the limit.
        registry.resolve(a.path()).await.unwrap();
    }

    #[tokio::test]
    async fn missing_paths_are_invalid() {
        let cache = TempDir::new().unwrap();
        let registry = registry(&cache, 4);
        let err = registry
            .resolve(Path::new("/definitely/not/a/real/path"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn files_are_not_project_roots() {
        let cache = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("main.rs");
        std::fs::write(&file, "fn main() {}").unwrap();

        let registry = registry(&cache, 4);
        let err = registry.resolve(&file).await.err().unwrap();
        assert!(matches!(err, ServiceError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn peek_never_admits() {
        let cache = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        let registry = registry(&cache, 4);

        assert!(registry.peek(dir.path()).await.unwrap().is_none());
        assert_eq!(registry.list().await.len(), 0);
    }
}
