use crate::chunk::{Chunk, ChunkHit, StoreStats};
use crate::error::{Result, StoreError};
use crate::hex_encode_lower;
use crate::store::ChunkStore;
use async_trait::async_trait;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.json";

/// Directory under `cache_root` holding one project's persisted store.
///
/// Keyed by a short stable hash of the canonical project path, so the same
/// project maps to the same directory across processes.
#[must_use]
pub fn store_dir_for_project(cache_root: &Path, project_path: &Path) -> PathBuf {
    let digest = Sha256::digest(project_path.to_string_lossy().as_bytes());
    let key = hex_encode_lower(&digest[..6]);
    cache_root.join(key)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct FileEntry {
    hash: String,
    chunk_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    files: BTreeMap<String, FileEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated_ms: Option<u64>,
}

struct StoreState {
    manifest: Manifest,
    /// Chunk table, loaded from disk on first access.
    chunks: Option<Vec<Chunk>>,
}

/// JSON-file-backed [`ChunkStore`].
///
/// The manifest (per-file hash and chunk count) is small and read eagerly
/// on open; the chunk table is loaded lazily on the first query or write.
/// Writes go through a temp file and rename, so a crash mid-write leaves
/// the prior data intact. A store that fails to parse on open stays usable
/// as an object: every read and write reports the corruption until
/// `clear()` wipes the directory.
pub struct JsonChunkStore {
    dir: PathBuf,
    state: RwLock<StoreState>,
    corruption: StdMutex<Option<String>>,
}

impl JsonChunkStore {
    /// Open (or create) the store directory and read its manifest.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let mut corruption = None;
        let manifest = if manifest_path.exists() {
            let raw = tokio::fs::read_to_string(&manifest_path).await?;
            match serde_json::from_str::<Manifest>(&raw) {
                Ok(manifest) => manifest,
                Err(err) => {
                    log::warn!(
                        "manifest at {} failed to parse: {err}",
                        manifest_path.display()
                    );
                    corruption = Some(format!("manifest unreadable: {err}"));
                    Manifest::default()
                }
            }
        } else {
            Manifest::default()
        };

        Ok(Self {
            dir,
            state: RwLock::new(StoreState {
                manifest,
                chunks: None,
            }),
            corruption: StdMutex::new(corruption),
        })
    }

    /// Open the store for `project_path` under `cache_root`.
    pub async fn open_for_project(cache_root: &Path, project_path: &Path) -> Result<Self> {
        Self::open(store_dir_for_project(cache_root, project_path)).await
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn check_usable(&self) -> Result<()> {
        match self.corruption.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(reason) => Err(StoreError::Corruption(reason.clone())),
                None => Ok(()),
            },
            Err(_) => Err(StoreError::Other("corruption flag poisoned".to_string())),
        }
    }

    fn mark_corrupt(&self, reason: String) {
        if let Ok(mut guard) = self.corruption.lock() {
            *guard = Some(reason);
        }
    }

    async fn ensure_chunks_loaded(&self, state: &mut StoreState) -> Result<()> {
        if state.chunks.is_some() {
            return Ok(());
        }
        let chunks_path = self.dir.join(CHUNKS_FILE);
        if !chunks_path.exists() {
            state.chunks = Some(Vec::new());
            return Ok(());
        }
        let raw = tokio::fs::read_to_string(&chunks_path).await?;
        match serde_json::from_str::<Vec<Chunk>>(&raw) {
            Ok(chunks) => {
                state.chunks = Some(chunks);
                Ok(())
            }
            Err(err) => {
                let reason = format!("chunk table unreadable: {err}");
                self.mark_corrupt(reason.clone());
                Err(StoreError::Corruption(reason))
            }
        }
    }

    async fn persist_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        write_atomic(&self.dir.join(CHUNKS_FILE), &serde_json::to_vec(chunks)?).await
    }

    async fn persist_manifest(&self, manifest: &Manifest) -> Result<()> {
        write_atomic(
            &self.dir.join(MANIFEST_FILE),
            &serde_json::to_vec_pretty(manifest)?,
        )
        .await
    }
}

#[async_trait]
impl ChunkStore for JsonChunkStore {
    async fn upsert_file(
        &self,
        file_path: &str,
        file_hash: &str,
        chunks: Vec<Chunk>,
    ) -> Result<()> {
        self.check_usable()?;
        let mut state = self.state.write().await;
        self.ensure_chunks_loaded(&mut state).await?;

        let existing = state.chunks.take().unwrap_or_default();
        let mut next: Vec<Chunk> = existing
            .into_iter()
            .filter(|chunk| chunk.file_path != file_path)
            .collect();
        let added = chunks.len();
        next.extend(chunks);

        // Persist before updating memory so a failed write leaves the
        // prior file set intact on disk and in the table.
        match self.persist_chunks(&next).await {
            Ok(()) => {}
            Err(err) => {
                state.chunks = None;
                return Err(err);
            }
        }

        state.manifest.files.insert(
            file_path.to_string(),
            FileEntry {
                hash: file_hash.to_string(),
                chunk_count: added,
            },
        );
        state.manifest.last_updated_ms = Some(now_ms());
        let manifest = state.manifest.clone();
        state.chunks = Some(next);
        drop(state);

        self.persist_manifest(&manifest).await?;
        log::debug!("upserted {added} chunks for {file_path}");
        Ok(())
    }

    async fn delete_by_file(&self, file_path: &str) -> Result<usize> {
        self.check_usable()?;
        let mut state = self.state.write().await;
        self.ensure_chunks_loaded(&mut state).await?;

        let existing = state.chunks.take().unwrap_or_default();
        let before = existing.len();
        let next: Vec<Chunk> = existing
            .into_iter()
            .filter(|chunk| chunk.file_path != file_path)
            .collect();
        let removed = before - next.len();

        if removed == 0 && !state.manifest.files.contains_key(file_path) {
            state.chunks = Some(next);
            return Ok(0);
        }

        match self.persist_chunks(&next).await {
            Ok(()) => {}
            Err(err) => {
                state.chunks = None;
                return Err(err);
            }
        }

        state.manifest.files.remove(file_path);
        state.manifest.last_updated_ms = Some(now_ms());
        let manifest = state.manifest.clone();
        state.chunks = Some(next);
        drop(state);

        self.persist_manifest(&manifest).await?;
        log::debug!("deleted {removed} chunks for {file_path}");
        Ok(removed)
    }

    async fn query_vector(&self, embedding: &[f32], k: usize) -> Result<Vec<ChunkHit>> {
        self.check_usable()?;
        let mut state = self.state.write().await;
        self.ensure_chunks_loaded(&mut state).await?;
        let chunks = state.chunks.as_deref().unwrap_or(&[]);

        let mut scored: Vec<ChunkHit> = chunks
            .iter()
            .filter_map(|chunk| {
                let score = cosine_similarity(embedding, &chunk.embedding)?;
                Some(hit_for(chunk, score))
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn query_keyword(&self, text: &str, k: usize) -> Result<Vec<ChunkHit>> {
        self.check_usable()?;
        let tokens = keyword_tokens(text);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.state.write().await;
        self.ensure_chunks_loaded(&mut state).await?;
        let chunks = state.chunks.as_deref().unwrap_or(&[]);

        let mut scored: Vec<ChunkHit> = chunks
            .iter()
            .filter_map(|chunk| {
                let score = keyword_score(chunk, &tokens);
                (score > 0.0).then(|| hit_for(chunk, score))
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn indexed_files(&self) -> Result<HashMap<String, String>> {
        self.check_usable()?;
        let state = self.state.read().await;
        Ok(state
            .manifest
            .files
            .iter()
            .map(|(path, entry)| (path.clone(), entry.hash.clone()))
            .collect())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let state = self.state.read().await;
        Ok(StoreStats {
            file_count: state.manifest.files.len(),
            chunk_count: state
                .manifest
                .files
                .values()
                .map(|entry| entry.chunk_count)
                .sum(),
            last_updated_ms: state.manifest.last_updated_ms,
        })
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        for name in [MANIFEST_FILE, CHUNKS_FILE] {
            let path = self.dir.join(name);
            if path.exists() {
                tokio::fs::remove_file(&path).await?;
            }
        }
        state.manifest = Manifest::default();
        state.chunks = Some(Vec::new());
        if let Ok(mut guard) = self.corruption.lock() {
            *guard = None;
        }
        log::info!("cleared store at {}", self.dir.display());
        Ok(())
    }

    fn corruption(&self) -> Option<String> {
        self.corruption.lock().ok().and_then(|guard| guard.clone())
    }
}

fn hit_for(chunk: &Chunk, score: f32) -> ChunkHit {
    ChunkHit {
        file_path: chunk.file_path.clone(),
        chunk_index: chunk.chunk_index,
        start_line: chunk.start_line,
        end_line: chunk.end_line,
        content: chunk.content.clone(),
        score,
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    let denom = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if denom <= f32::EPSILON {
        return None;
    }
    let score = a.dot(&b) / denom;
    score.is_finite().then_some(score)
}

/// Query tokens: lowercase alphanumeric runs, three characters or longer.
fn keyword_tokens(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter_map(|raw| {
            let token = raw.trim().to_ascii_lowercase();
            (token.len() >= 3).then_some(token)
        })
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

#[allow(clippy::cast_precision_loss)]
fn keyword_score(chunk: &Chunk, tokens: &[String]) -> f32 {
    let content = chunk.content.to_ascii_lowercase();
    let path = chunk.file_path.to_ascii_lowercase();

    let mut matched = 0usize;
    let mut occurrences = 0usize;
    for token in tokens {
        let in_content = content.matches(token.as_str()).count();
        let in_path = path.matches(token.as_str()).count();
        if in_content + in_path > 0 {
            matched += 1;
            // Path hits weigh heavier than body hits.
            occurrences += in_content + in_path * 2;
        }
    }
    if matched == 0 {
        return 0.0;
    }
    let coverage = matched as f32 / tokens.len() as f32;
    let density = occurrences as f32 / (occurrences as f32 + 20.0);
    coverage + density * 0.25
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
