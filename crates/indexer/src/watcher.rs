use crate::error::{IndexerError, Result};
use crate::scanner::is_source_file;
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;

const IGNORED_COMPONENTS: &[&str] = &[".git", ".hg", ".svn", "target", "node_modules", "dist", "build"];

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Quiet window after the last event before a batch flushes.
    pub debounce: Duration,
    /// Upper bound on how long a busy stream can defer a flush.
    pub max_batch_wait: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            max_batch_wait: Duration::from_secs(3),
        }
    }
}

enum WatcherCommand {
    Shutdown,
}

/// Owned file-watch task for one project.
///
/// Emits debounced batches of changed source paths on the receiver returned
/// by [`ProjectWatcher::start`]. Dropping the handle (or calling
/// [`ProjectWatcher::shutdown`]) stops the backend and the debounce loop.
pub struct ProjectWatcher {
    command_tx: mpsc::Sender<WatcherCommand>,
    _watcher: StdMutex<Option<RecommendedWatcher>>,
}

impl ProjectWatcher {
    pub fn start(
        root: &Path,
        config: WatcherConfig,
    ) -> Result<(Self, mpsc::Receiver<Vec<PathBuf>>)> {
        let (event_tx, event_rx) = mpsc::channel(1024);
        let (command_tx, command_rx) = mpsc::channel(4);
        let (batch_tx, batch_rx) = mpsc::channel(16);

        let root_buf = root.to_path_buf();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.blocking_send(res);
            },
            NotifyConfig::default(),
        )
        .map_err(|e| IndexerError::Watch(format!("watcher init failed: {e}")))?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| IndexerError::Watch(format!("failed to watch {}: {e}", root.display())))?;

        spawn_debounce_loop(root_buf, config, event_rx, command_rx, batch_tx);

        Ok((
            Self {
                command_tx,
                _watcher: StdMutex::new(Some(watcher)),
            },
            batch_rx,
        ))
    }

    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(WatcherCommand::Shutdown).await;
        if let Ok(mut guard) = self._watcher.lock() {
            guard.take();
        }
    }
}

impl Drop for ProjectWatcher {
    fn drop(&mut self) {
        let _ = self.command_tx.try_send(WatcherCommand::Shutdown);
    }
}

fn spawn_debounce_loop(
    root: PathBuf,
    config: WatcherConfig,
    mut event_rx: mpsc::Receiver<notify::Result<Event>>,
    mut command_rx: mpsc::Receiver<WatcherCommand>,
    batch_tx: mpsc::Sender<Vec<PathBuf>>,
) {
    tokio::spawn(async move {
        let mut state = DebounceState::new(config.debounce, config.max_batch_wait);

        loop {
            let next_deadline = state.next_deadline();

            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(event) => handle_event(&root, event, &mut state),
                        None => break,
                    }
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(WatcherCommand::Shutdown) | None => break,
                    }
                }
                () = async {
                    if let Some(deadline) = next_deadline {
                        time::sleep_until(deadline).await;
                    }
                }, if next_deadline.is_some() => {
                    let batch = state.take_batch();
                    if !batch.is_empty() {
                        log::debug!("flushing {} changed path(s) under {}", batch.len(), root.display());
                        if batch_tx.send(batch).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
        log::debug!("watcher loop for {} stopped", root.display());
    });
}

fn handle_event(root: &Path, event: notify::Result<Event>, state: &mut DebounceState) {
    match event {
        Ok(event) => {
            for path in event.paths {
                if is_relevant_path(root, &path) {
                    state.record_path(path);
                }
            }
        }
        Err(err) => log::warn!("watcher error: {err}"),
    }
}

fn is_relevant_path(root: &Path, path: &Path) -> bool {
    if !is_source_file(path) {
        return false;
    }
    if let Ok(relative) = path.strip_prefix(root) {
        for component in relative.components() {
            let name = component.as_os_str().to_string_lossy().to_ascii_lowercase();
            if IGNORED_COMPONENTS.contains(&name.as_str()) {
                return false;
            }
        }
    }
    true
}

struct DebounceState {
    debounce: Duration,
    max_batch: Duration,
    pending: Vec<PathBuf>,
    last_event: Option<time::Instant>,
    first_event: Option<time::Instant>,
}

impl DebounceState {
    const fn new(debounce: Duration, max_batch: Duration) -> Self {
        Self {
            debounce,
            max_batch,
            pending: Vec::new(),
            last_event: None,
            first_event: None,
        }
    }

    fn record_path(&mut self, path: PathBuf) {
        if !self.pending.contains(&path) {
            self.pending.push(path);
        }
        let now = time::Instant::now();
        self.last_event = Some(now);
        self.first_event.get_or_insert(now);
    }

    fn next_deadline(&self) -> Option<time::Instant> {
        if self.pending.is_empty() {
            return None;
        }
        let quiet = self.last_event.map(|last| last + self.debounce);
        let forced = self.first_event.map(|first| first + self.max_batch);
        match (quiet, forced) {
            (Some(q), Some(f)) => Some(q.min(f)),
            (deadline, None) | (None, deadline) => deadline,
        }
    }

    fn take_batch(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.first_event = None;
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(start_paused = true)]
    async fn quiet_window_sets_the_deadline() {
        let mut state = DebounceState::new(Duration::from_millis(500), Duration::from_secs(3));
        assert!(state.next_deadline().is_none());

        state.record_path(PathBuf::from("src/lib.rs"));
        let deadline = state.next_deadline().unwrap();
        assert_eq!(deadline - time::Instant::now(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn busy_stream_is_capped_by_max_batch_wait() {
        let mut state = DebounceState::new(Duration::from_secs(1), Duration::from_secs(3));
        state.record_path(PathBuf::from("a.rs"));
        // Keep resetting the quiet window for longer than the cap.
        for _ in 0..10 {
            time::advance(Duration::from_millis(500)).await;
            state.record_path(PathBuf::from("b.rs"));
        }
        let deadline = state.next_deadline().unwrap();
        // The forced deadline from the first event wins over the quiet window.
        assert!(deadline <= time::Instant::now());
    }

    #[tokio::test(start_paused = true)]
    async fn batch_deduplicates_and_resets() {
        let mut state = DebounceState::new(Duration::from_millis(500), Duration::from_secs(3));
        state.record_path(PathBuf::from("a.rs"));
        state.record_path(PathBuf::from("a.rs"));
        state.record_path(PathBuf::from("b.rs"));

        let batch = state.take_batch();
        assert_eq!(batch, vec![PathBuf::from("a.rs"), PathBuf::from("b.rs")]);
        assert!(state.next_deadline().is_none());
        assert!(state.take_batch().is_empty());
    }

    #[test]
    fn ignored_directories_and_extensions_are_filtered() {
        let root = Path::new("/proj");
        assert!(is_relevant_path(root, Path::new("/proj/src/main.rs")));
        assert!(!is_relevant_path(root, Path::new("/proj/target/debug/main.rs")));
        assert!(!is_relevant_path(root, Path::new("/proj/node_modules/pkg/index.js")));
        assert!(!is_relevant_path(root, Path::new("/proj/src/main.lock")));
    }
}
