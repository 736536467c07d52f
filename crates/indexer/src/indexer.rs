use crate::chunker::{chunk_lines, FileChunk};
use crate::error::{IndexerError, Result};
use crate::scanner::{is_source_file, FileScanner};
use codescout_embeddings::EmbeddingProvider;
use codescout_store::{hex_encode_lower, Chunk, ChunkStore, StoreStats};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const MAX_CONCURRENT_READS: usize = 16;

/// Outcome of a build or refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Files tracked by the store after this pass.
    pub file_count: usize,
    /// Chunks tracked by the store after this pass.
    pub chunk_count: usize,
    pub files_embedded: usize,
    pub chunks_embedded: usize,
    /// Files whose content hash was unchanged.
    pub files_skipped: usize,
    /// Files whose chunks were dropped because the source vanished.
    pub files_deleted: usize,
    pub time_ms: u64,
}

/// Builds and refreshes one project's chunk store.
///
/// The hash check is the heart of the pipeline: a file whose content hash
/// matches the store's manifest is skipped before chunking, so re-indexing
/// an unchanged project performs zero embedding calls.
pub struct Indexer {
    root: PathBuf,
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

struct PendingFile {
    relative_path: String,
    hash: String,
    chunks: Vec<FileChunk>,
}

impl Indexer {
    pub fn new(
        root: impl AsRef<Path>,
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root,
            store,
            embedder,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full build: discover, hash-skip, chunk, embed, upsert, prune.
    pub async fn build_full(&self) -> Result<BuildSummary> {
        let started = Instant::now();

        if let Some(reason) = self.store.corruption() {
            log::warn!(
                "store for {} is corrupted ({reason}); clearing before rebuild",
                self.root.display()
            );
            self.store.clear().await?;
        }

        log::info!("indexing project at {}", self.root.display());
        let files = FileScanner::new(&self.root).scan();
        let known = self.store.indexed_files().await?;

        let mut summary = BuildSummary::default();
        let read = self.read_files(&files).await;
        let mut pending: Vec<PendingFile> = Vec::new();
        let mut live: HashSet<String> = HashSet::with_capacity(files.len());

        for (relative_path, content, hash) in read {
            live.insert(relative_path.clone());
            if known.get(&relative_path) == Some(&hash) {
                summary.files_skipped += 1;
                continue;
            }
            pending.push(PendingFile {
                relative_path,
                hash,
                chunks: chunk_lines(&content),
            });
        }

        self.embed_and_upsert(&mut summary, pending).await?;

        // Files present in the store but gone from discovery lose their chunks.
        for stale in known.keys().filter(|path| !live.contains(*path)) {
            self.store.delete_by_file(stale).await?;
            summary.files_deleted += 1;
        }

        self.finish(&mut summary, started).await?;
        log::info!(
            "indexed {} files ({} chunks) in {}ms: {} embedded, {} unchanged, {} removed",
            summary.file_count,
            summary.chunk_count,
            summary.time_ms,
            summary.files_embedded,
            summary.files_skipped,
            summary.files_deleted
        );
        Ok(summary)
    }

    /// Incremental refresh of specific paths, typically from the watcher.
    ///
    /// Deleted files drop their chunks; changed files run the same
    /// hash-skip/chunk/embed/upsert pipeline as a full build.
    pub async fn refresh_paths(&self, paths: &[PathBuf]) -> Result<BuildSummary> {
        let started = Instant::now();
        let known = self.store.indexed_files().await?;
        let mut summary = BuildSummary::default();

        let mut candidates: Vec<PathBuf> = Vec::new();
        for path in paths {
            let absolute = if path.is_absolute() {
                path.clone()
            } else {
                self.root.join(path)
            };
            if !is_source_file(&absolute) {
                continue;
            }
            if absolute.exists() {
                candidates.push(absolute);
            } else {
                let relative = self.normalize_path(&absolute);
                if known.contains_key(&relative) {
                    self.store.delete_by_file(&relative).await?;
                    summary.files_deleted += 1;
                }
            }
        }

        let read = self.read_files(&candidates).await;
        let mut pending: Vec<PendingFile> = Vec::new();
        for (relative_path, content, hash) in read {
            if known.get(&relative_path) == Some(&hash) {
                summary.files_skipped += 1;
                continue;
            }
            pending.push(PendingFile {
                relative_path,
                hash,
                chunks: chunk_lines(&content),
            });
        }

        self.embed_and_upsert(&mut summary, pending).await?;
        self.finish(&mut summary, started).await?;
        log::debug!(
            "refreshed {} files ({} deleted, {} unchanged) in {}ms",
            summary.files_embedded,
            summary.files_deleted,
            summary.files_skipped,
            summary.time_ms
        );
        Ok(summary)
    }

    async fn embed_and_upsert(
        &self,
        summary: &mut BuildSummary,
        pending: Vec<PendingFile>,
    ) -> Result<()> {
        let texts: Vec<String> = pending
            .iter()
            .flat_map(|file| file.chunks.iter().map(|chunk| chunk.content.clone()))
            .collect();
        if texts.is_empty() {
            // Empty files still need their (possibly stale) chunks replaced.
            for file in pending {
                self.store
                    .upsert_file(&file.relative_path, &file.hash, Vec::new())
                    .await?;
                summary.files_embedded += 1;
            }
            return Ok(());
        }

        let batch = self.embedder.embed_documents(&texts).await?;
        let mut vectors = batch.embeddings.into_iter();
        let indexed_at_ms = now_ms();

        for file in pending {
            let chunks: Vec<Chunk> = file
                .chunks
                .into_iter()
                .enumerate()
                .map(|(index, chunk)| Chunk {
                    id: Chunk::chunk_id(&file.relative_path, index),
                    file_path: file.relative_path.clone(),
                    chunk_index: index,
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    content: chunk.content,
                    embedding: vectors.next().unwrap_or_default(),
                    file_hash: file.hash.clone(),
                    indexed_at_ms,
                })
                .collect();
            summary.chunks_embedded += chunks.len();
            summary.files_embedded += 1;
            self.store
                .upsert_file(&file.relative_path, &file.hash, chunks)
                .await?;
        }
        Ok(())
    }

    async fn finish(&self, summary: &mut BuildSummary, started: Instant) -> Result<()> {
        let StoreStats {
            file_count,
            chunk_count,
            ..
        } = self.store.stats().await?;
        summary.file_count = file_count;
        summary.chunk_count = chunk_count;
        #[allow(clippy::cast_possible_truncation)]
        {
            summary.time_ms = (started.elapsed().as_millis() as u64).max(1);
        }
        Ok(())
    }

    /// Read and hash files in bounded parallel batches.
    async fn read_files(&self, files: &[PathBuf]) -> Vec<(String, String, String)> {
        let mut out = Vec::with_capacity(files.len());
        for batch in files.chunks(MAX_CONCURRENT_READS) {
            let mut tasks = Vec::with_capacity(batch.len());
            for path in batch {
                let path = path.clone();
                tasks.push(tokio::spawn(async move {
                    let content = tokio::fs::read_to_string(&path).await?;
                    let hash = content_hash(&content);
                    Ok::<_, std::io::Error>((path, content, hash))
                }));
            }
            for task in tasks {
                match task.await {
                    Ok(Ok((path, content, hash))) => {
                        out.push((self.normalize_path(&path), content, hash));
                    }
                    Ok(Err(err)) => log::warn!("failed to read file: {err}"),
                    Err(err) => log::warn!("read task panicked: {err}"),
                }
            }
        }
        out
    }

    fn normalize_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut normalized = relative.to_string_lossy().to_string();
        if normalized.contains('\\') {
            normalized = normalized.replace('\\', "/");
        }
        normalized
    }
}

/// Content hash used for the unchanged-file skip.
#[must_use]
pub fn content_hash(content: &str) -> String {
    hex_encode_lower(&Sha256::digest(content.as_bytes()))
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
