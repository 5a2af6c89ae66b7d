//! Shared fakes for the sync integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{self, BoxFuture};
use scorecard_engine::ScoreEntry;
use scorecard_sync::store::StorageResult;
use scorecard_sync::{
    KvStore, MemoryKvStore, NetworkMonitor, OfflineQueue, RemoteError, RemoteScores,
    SharedKvStore, StorageError, SubmissionRouter,
};

/// Remote that records every call and succeeds unless told to fail.
#[derive(Default)]
pub struct RecordingRemote {
    calls: Mutex<Vec<(String, Vec<ScoreEntry>)>>,
    fail: AtomicBool,
}

impl RecordingRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let remote = Self::new();
        remote.set_failing(true);
        remote
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, Vec<ScoreEntry>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl RemoteScores for RecordingRemote {
    fn submit_scores(
        &self,
        round_id: &str,
        scores: Vec<ScoreEntry>,
    ) -> BoxFuture<'static, Result<(), RemoteError>> {
        self.calls
            .lock()
            .unwrap()
            .push((round_id.to_string(), scores));

        let result = if self.fail.load(Ordering::SeqCst) {
            Err(RemoteError::Server(503))
        } else {
            Ok(())
        };
        Box::pin(future::ready(result))
    }
}

/// Store that can be switched to fail every write.
#[derive(Default)]
pub struct FailingKvStore {
    inner: MemoryKvStore,
    fail_writes: AtomicBool,
}

impl FailingKvStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seeded<const N: usize>(entries: [(&str, &str); N]) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryKvStore::with_entries(entries),
            fail_writes: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn memory(&self) -> &MemoryKvStore {
        &self.inner
    }

    fn refuse(&self) -> Option<StorageError> {
        self.fail_writes.load(Ordering::SeqCst).then(|| {
            StorageError::unavailable("write refused", io::Error::other("disk full"))
        })
    }
}

impl KvStore for FailingKvStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>> {
        match self.refuse() {
            Some(e) => Box::pin(future::ready(Err(e))),
            None => self.inner.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        match self.refuse() {
            Some(e) => Box::pin(future::ready(Err(e))),
            None => self.inner.remove(key),
        }
    }
}

/// Store whose writes land only after `delay`.
pub struct SlowKvStore {
    inner: MemoryKvStore,
    delay: Duration,
}

impl SlowKvStore {
    pub fn new(inner: &MemoryKvStore, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: inner.clone(),
            delay,
        })
    }
}

impl KvStore for SlowKvStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        let key = key.to_string();
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            inner.set(&key, value).await
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.remove(key)
    }
}

pub fn shared(store: &MemoryKvStore) -> SharedKvStore {
    Arc::new(store.clone())
}

/// Router, monitor and queue over one in-memory store.
pub struct Harness {
    pub store: MemoryKvStore,
    pub monitor: Arc<NetworkMonitor>,
    pub remote: Arc<RecordingRemote>,
    pub queue: Arc<OfflineQueue>,
    pub router: SubmissionRouter,
}

impl Harness {
    pub fn new(online: bool) -> Self {
        Self::with_store(MemoryKvStore::new(), online)
    }

    pub fn with_store(store: MemoryKvStore, online: bool) -> Self {
        let monitor = Arc::new(NetworkMonitor::with_state(online));
        let remote = RecordingRemote::new();
        let queue = Arc::new(OfflineQueue::new(shared(&store)));
        let router = SubmissionRouter::new(monitor.clone(), remote.clone(), queue.clone());

        Self {
            store,
            monitor,
            remote,
            queue,
            router,
        }
    }
}

pub fn entry(player: &str, hole: u32, strokes: u32) -> ScoreEntry {
    ScoreEntry::new(player, hole, strokes)
}
