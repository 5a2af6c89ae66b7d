//! In-memory key-value store.
//!
//! Used for ephemeral sessions and as the store in tests. It counts writes so
//! callers can check that a code path did or did not persist.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{self, BoxFuture};

use super::{KvStore, StorageResult};

/// Thread-safe in-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<DashMap<String, String>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given entries. Seeding is not counted as a write.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        for (key, value) in entries {
            store.entries.insert(key.into(), value.into());
        }
        store
    }

    /// Read a value without going through the async interface.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Number of `set` and `remove` calls served so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        Box::pin(future::ready(Ok(self.peek(key))))
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(key.to_string(), value);
        Box::pin(future::ready(Ok(())))
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries.remove(key);
        Box::pin(future::ready(Ok(())))
    }
}
