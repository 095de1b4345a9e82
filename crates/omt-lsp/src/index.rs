//! Document Index
//!
//! Caches the latest [`DocumentAnalysis`] of every document the server has
//! looked at. Edits are debounced per document: each edit replaces the pending
//! recomputation of the same document, and readers keep getting the previous
//! analysis until the recomputation has finished.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, warn};

use omt_core::{AliasConfigs, AnalysisContext, AnalysisError, DocumentAnalysis, FileSystem};

/// Cached state of one document
#[derive(Debug, Clone)]
struct Entry {
    text: String,
    analysis: Arc<DocumentAnalysis>,
    revision: u64,
    problem: Option<AnalysisError>,
    /// Opened by the editor, as opposed to read from disk for a lookup
    open: bool,
}

/// A scheduled recomputation
struct Pending {
    ticket: u64,
    handle: AbortHandle,
    /// Editor text the recomputation will analyse
    text: String,
}

struct IndexState {
    fs: Arc<dyn FileSystem>,
    aliases: Arc<RwLock<AliasConfigs>>,
    entries: RwLock<HashMap<PathBuf, Entry>>,
    pending: Mutex<HashMap<PathBuf, Pending>>,
    next_ticket: AtomicU64,
    debounce_ms: AtomicU64,
}

impl IndexState {
    async fn analyze(&self, path: &Path, text: &str) -> (Arc<DocumentAnalysis>, Option<AnalysisError>) {
        let aliases = self.aliases.read().await;
        let context = AnalysisContext::new(self.fs.as_ref(), &aliases);

        match context.analyze_text(path, text) {
            Ok(analysis) => (Arc::new(analysis), None),
            Err(e) => {
                match &e {
                    AnalysisError::MalformedDocument(_) => {
                        warn!("{} degraded to an empty analysis: {}", path.display(), e)
                    }
                    _ => error!("Inconsistent definitions in {}: {}", path.display(), e),
                }
                (Arc::new(DocumentAnalysis::default()), Some(e))
            }
        }
    }

    async fn store(&self, path: &Path, text: String, open: bool) -> Arc<DocumentAnalysis> {
        let (analysis, problem) = self.analyze(path, &text).await;

        let mut entries = self.entries.write().await;
        let previous = entries.get(path);
        let revision = previous.map_or(0, |entry| entry.revision) + 1;
        let open = open || previous.is_some_and(|entry| entry.open);
        entries.insert(
            path.to_path_buf(),
            Entry {
                text,
                analysis: Arc::clone(&analysis),
                revision,
                problem,
                open,
            },
        );
        analysis
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(&self, path: &Path) {
        if let Some(previous) = self.pending().remove(path) {
            previous.handle.abort();
        }
    }

    /// Drop the pending marker unless a newer edit replaced it
    fn finish(&self, path: &Path, ticket: u64) {
        let mut pending = self.pending();
        if pending.get(path).is_some_and(|p| p.ticket == ticket) {
            pending.remove(path);
        }
    }
}

/// Per-document analysis cache with debounced recomputation
#[derive(Clone)]
pub struct DocumentIndex {
    state: Arc<IndexState>,
}

impl DocumentIndex {
    pub fn new(fs: Arc<dyn FileSystem>, aliases: Arc<RwLock<AliasConfigs>>, debounce: Duration) -> Self {
        Self {
            state: Arc::new(IndexState {
                fs,
                aliases,
                entries: RwLock::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(0),
                debounce_ms: AtomicU64::new(debounce.as_millis() as u64),
            }),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.state.debounce_ms.load(Ordering::Relaxed))
    }

    /// Change the quiet period for edits made from now on
    pub fn set_debounce(&self, debounce: Duration) {
        self.state
            .debounce_ms
            .store(debounce.as_millis() as u64, Ordering::Relaxed);
    }

    /// Analyse a document right away, replacing any pending recomputation
    pub async fn open(&self, path: &Path, text: String) -> Arc<DocumentAnalysis> {
        self.state.cancel(path);
        self.state.store(path, text, true).await
    }

    /// Schedule a recomputation after the quiet period.
    ///
    /// A recomputation already pending for the same document is cancelled,
    /// and awaiting its handle then yields a cancelled `JoinError`. The
    /// returned handle completes once the new analysis is cached.
    /// Must be called from within a tokio runtime.
    pub fn invalidate(&self, path: &Path, text: String) -> JoinHandle<()> {
        let key = path.to_path_buf();
        let ticket = self.state.next_ticket.fetch_add(1, Ordering::Relaxed);
        let delay = self.debounce();

        let mut pending = self.state.pending();
        if let Some(previous) = pending.remove(&key) {
            previous.handle.abort();
        }

        let state = Arc::clone(&self.state);
        let task_key = key.clone();
        let task_text = text.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Recomputing analysis for {}", task_key.display());
            state.store(&task_key, task_text, true).await;
            state.finish(&task_key, ticket);
        });

        pending.insert(
            key,
            Pending {
                ticket,
                handle: task.abort_handle(),
                text,
            },
        );
        task
    }

    /// Latest analysis of a document.
    ///
    /// Documents never seen before are read through the filesystem and
    /// cached. Returns `None` when such a document cannot be read.
    pub async fn get(&self, path: &Path) -> Option<Arc<DocumentAnalysis>> {
        if let Some(entry) = self.state.entries.read().await.get(path) {
            return Some(Arc::clone(&entry.analysis));
        }

        let text = match self.state.fs.read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                return None;
            }
        };
        Some(self.state.store(path, text, false).await)
    }

    /// Forget a document closed by the editor
    pub async fn close(&self, path: &Path) {
        self.state.cancel(path);
        self.state.entries.write().await.remove(path);
    }

    /// Drop a disk-read cache entry after the file changed on disk.
    ///
    /// Documents open in the editor are left alone, the editor owns their text.
    pub async fn refresh_from_disk(&self, path: &Path) {
        let mut entries = self.state.entries.write().await;
        if entries.get(path).is_some_and(|entry| !entry.open) {
            entries.remove(path);
        }
    }

    /// Number of completed analyses of a document
    pub async fn revision(&self, path: &Path) -> Option<u64> {
        self.state.entries.read().await.get(path).map(|entry| entry.revision)
    }

    /// Text the cached analysis was computed from
    pub async fn text(&self, path: &Path) -> Option<String> {
        self.state.entries.read().await.get(path).map(|entry| entry.text.clone())
    }

    /// Newest known text of a document, including edits still in their
    /// quiet period
    pub async fn latest_text(&self, path: &Path) -> Option<String> {
        let pending = self.state.pending().get(path).map(|p| p.text.clone());
        match pending {
            Some(text) => Some(text),
            None => self.text(path).await,
        }
    }

    /// Why the cached analysis is empty, if extraction failed
    pub async fn problem(&self, path: &Path) -> Option<AnalysisError> {
        self.state
            .entries
            .read()
            .await
            .get(path)
            .and_then(|entry| entry.problem.clone())
    }

    /// Whether a recomputation is scheduled for the document
    pub fn is_pending(&self, path: &Path) -> bool {
        self.state.pending().contains_key(path)
    }
}
