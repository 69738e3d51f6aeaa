//! Shared per-run progress state: key cache, counters, and log sink.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::OnceCell;

/// Sink receiving human-readable progress lines during a reconciliation run.
pub trait ProgressLog: Send + Sync {
    /// Records one progress message.
    fn log(&self, message: &str);
}

/// Default sink that emits progress lines through `tracing` at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl ProgressLog for TracingLog {
    fn log(&self, message: &str) {
        tracing::info!("{message}");
    }
}

/// Mutable state threaded through one reconciliation run.
///
/// The remote key list is populated at most once and deliberately never
/// invalidated mid-run: records appearing remotely after the cache fill are
/// not seen. Callers must create a fresh `Progress` per run to avoid stale
/// reads. Counters are monotonic and never reset.
pub struct Progress {
    known_keys: OnceCell<Vec<String>>,
    deleted: AtomicU64,
    upserted: AtomicU64,
    sink: Arc<dyn ProgressLog>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    /// Creates progress state logging through [`TracingLog`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_log(Arc::new(TracingLog))
    }

    /// Creates progress state with a caller-supplied log sink.
    #[must_use]
    pub fn with_log(sink: Arc<dyn ProgressLog>) -> Self {
        Self {
            known_keys: OnceCell::new(),
            deleted: AtomicU64::new(0),
            upserted: AtomicU64::new(0),
            sink,
        }
    }

    /// Pre-seeds the remote key snapshot, skipping the listing call.
    ///
    /// This makes the populate-once contract visible at the call site when a
    /// caller already holds the remote key list.
    #[must_use]
    pub fn with_known_keys(mut self, keys: Vec<String>) -> Self {
        self.known_keys = OnceCell::new_with(Some(keys));
        self
    }

    /// Emits one progress line to the configured sink.
    pub fn log(&self, message: &str) {
        self.sink.log(message);
    }

    /// Returns the cached remote key list, when populated.
    #[must_use]
    pub fn known_keys(&self) -> Option<&[String]> {
        self.known_keys.get().map(Vec::as_slice)
    }

    /// Returns the cached key list, running `init` to populate it on first
    /// use. Concurrent callers observe a single initialisation; later calls
    /// return the cached value without invoking `init`.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `init` unchanged; the cache stays
    /// unpopulated so a later call may retry.
    pub async fn known_keys_or_init<E, F, Fut>(&self, init: F) -> Result<&[String], E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, E>>,
    {
        self.known_keys
            .get_or_try_init(init)
            .await
            .map(Vec::as_slice)
    }

    /// Increments the deletion counter.
    pub fn record_deletion(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the upsert counter.
    pub fn record_upsert(&self) {
        self.upserted.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of deletions issued so far in this run.
    #[must_use]
    pub fn deleted(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }

    /// Number of upserts issued so far in this run.
    #[must_use]
    pub fn upserted(&self) -> u64 {
        self.upserted.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("known_keys", &self.known_keys.get())
            .field("deleted", &self.deleted)
            .field("upserted", &self.upserted)
            .finish_non_exhaustive()
    }
}
