//! Debounced persistence of the in-memory scorecard.
//!
//! Every edit calls [`DebouncedPersister::notify_changed`] with a snapshot.
//! The snapshot is written once edits have stopped for the quiet period, or
//! right away on [`DebouncedPersister::flush`]. Progress is published as a
//! [`SaveStatus`] on a watch channel.
//!
//! ```text
//! notify ──> Saving ──(quiet period)──> write ──ok──> Saved ──(display)──> Idle
//!                                           └──err──> Error
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use scorecard_engine::HoleScoreMap;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::store::{scorecard_key, SharedKvStore};

/// Default quiet period before a write.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(600);

/// Default time the saved indicator stays up.
pub const DEFAULT_SAVED_DISPLAY: Duration = Duration::from_millis(2_500);

/// Save indicator shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Error,
}

struct Pending {
    generation: u64,
    snapshot: HoleScoreMap,
    timer: JoinHandle<()>,
}

struct Inner {
    store: SharedKvStore,
    key: String,
    quiet_period: Duration,
    saved_display: Duration,
    pending: Mutex<Option<Pending>>,
    generation: AtomicU64,
    /// Serializes writes; holds the generation last persisted.
    written: tokio::sync::Mutex<u64>,
    status: watch::Sender<SaveStatus>,
    status_epoch: AtomicU64,
    closed: AtomicBool,
}

impl Inner {
    fn lock_pending(&self) -> MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: SaveStatus) -> u64 {
        let epoch = self.status_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.send_replace(status);
        epoch
    }

    async fn fire(self: Arc<Self>, generation: u64) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        let snapshot = {
            let mut pending = self.lock_pending();
            match pending.as_ref() {
                Some(p) if p.generation == generation => pending.take().map(|p| p.snapshot),
                _ => None,
            }
        };

        if let Some(snapshot) = snapshot {
            self.write(generation, snapshot).await;
        }
    }

    async fn write(self: &Arc<Self>, generation: u64, snapshot: HoleScoreMap) {
        let mut written = self.written.lock().await;
        if generation <= *written {
            return;
        }

        let json = match snapshot.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to encode scorecard");
                self.set_status(SaveStatus::Error);
                return;
            }
        };

        match self.store.set(&self.key, json).await {
            Ok(()) => {
                *written = generation;
                tracing::debug!(key = %self.key, generation, "scorecard saved");
                if generation == self.generation.load(Ordering::SeqCst) {
                    self.mark_saved();
                }
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to save scorecard");
                self.set_status(SaveStatus::Error);
            }
        }
    }

    fn mark_saved(self: &Arc<Self>) {
        let epoch = self.set_status(SaveStatus::Saved);
        let inner = Arc::downgrade(self);
        let display = self.saved_display;

        tokio::spawn(async move {
            tokio::time::sleep(display).await;
            if let Some(inner) = inner.upgrade() {
                if inner.status_epoch.load(Ordering::SeqCst) == epoch {
                    inner.set_status(SaveStatus::Idle);
                }
            }
        });
    }
}

/// Writes scorecard snapshots after a quiet period.
///
/// Must be used from within a Tokio runtime. Dropping the persister discards
/// any pending snapshot; call [`flush`](Self::flush) first to keep it.
pub struct DebouncedPersister {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for DebouncedPersister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedPersister")
            .field("key", &self.inner.key)
            .field("status", &self.status())
            .field("pending", &self.has_pending())
            .finish()
    }
}

impl DebouncedPersister {
    /// Create a persister writing under `key` with default timings.
    pub fn new(store: SharedKvStore, key: impl Into<String>) -> Self {
        Self::with_timing(store, key, DEFAULT_QUIET_PERIOD, DEFAULT_SAVED_DISPLAY)
    }

    /// Create a persister with explicit timings.
    pub fn with_timing(
        store: SharedKvStore,
        key: impl Into<String>,
        quiet_period: Duration,
        saved_display: Duration,
    ) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);

        Self {
            inner: Arc::new(Inner {
                store,
                key: key.into(),
                quiet_period,
                saved_display,
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
                written: tokio::sync::Mutex::new(0),
                status,
                status_epoch: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Create a persister for a round's scorecard using configured timings.
    pub fn for_round(store: SharedKvStore, round_id: &str, config: &SyncConfig) -> Self {
        Self::with_timing(
            store,
            scorecard_key(round_id),
            config.debounce,
            config.saved_display,
        )
    }

    /// Record a new snapshot and restart the quiet-period timer.
    pub fn notify_changed(&self, snapshot: HoleScoreMap) {
        let inner = &self.inner;
        if inner.closed.load(Ordering::SeqCst) {
            tracing::debug!(key = %inner.key, "change after close ignored");
            return;
        }

        inner.set_status(SaveStatus::Saving);
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut pending = inner.lock_pending();
        if let Some(previous) = pending.take() {
            previous.timer.abort();
        }

        let weak: Weak<Inner> = Arc::downgrade(inner);
        let quiet_period = inner.quiet_period;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire(generation).await;
            }
        });

        *pending = Some(Pending {
            generation,
            snapshot,
            timer,
        });
    }

    /// Write the pending snapshot now.
    ///
    /// Without a pending snapshot nothing is written, but a write already in
    /// flight is awaited.
    pub async fn flush(&self) {
        let pending = self.inner.lock_pending().take();

        match pending {
            Some(pending) => {
                pending.timer.abort();
                self.inner.write(pending.generation, pending.snapshot).await;
            }
            None => {
                let _written = self.inner.written.lock().await;
            }
        }
    }

    /// Drop the pending snapshot without writing it.
    pub fn cancel(&self) {
        if let Some(pending) = self.inner.lock_pending().take() {
            pending.timer.abort();
            tracing::debug!(key = %self.inner.key, "pending save discarded");
            if *self.inner.status.borrow() == SaveStatus::Saving {
                self.inner.set_status(SaveStatus::Idle);
            }
        }
    }

    /// Stop accepting changes and discard anything pending.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.cancel();
    }

    /// Current save indicator.
    pub fn status(&self) -> SaveStatus {
        *self.inner.status.borrow()
    }

    /// Receiver that observes every save indicator change.
    pub fn watch_status(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }

    /// Whether a snapshot is waiting for its timer.
    pub fn has_pending(&self) -> bool {
        self.inner.lock_pending().is_some()
    }

    /// Key the snapshots are written under.
    pub fn key(&self) -> &str {
        &self.inner.key
    }
}

impl Drop for DebouncedPersister {
    fn drop(&mut self) {
        self.close();
    }
}
