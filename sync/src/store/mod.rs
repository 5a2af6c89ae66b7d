//! Persistent key-value storage for scorecards and the offline queue.
//!
//! Both components share one store under distinct keys, so no two writers
//! ever touch the same key.

mod memory;
mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

use futures::future::BoxFuture;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Key under which the offline operation queue is persisted.
pub const OFFLINE_QUEUE_KEY: &str = "@offline_queue";

/// Key holding the last queue blob that could not be fully decoded.
pub const OFFLINE_QUEUE_QUARANTINE_KEY: &str = "@offline_queue_quarantine";

/// Key under which a round's scorecard is persisted.
pub fn scorecard_key(round_id: &str) -> String {
    format!("scorecard_{}", round_id)
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: Box::new(source),
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::unavailable("sqlite query failed", err)
    }
}

/// Durable get/set/remove of string blobs keyed by string.
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>>;
}

/// Store handle shared between components.
pub type SharedKvStore = Arc<dyn KvStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format() {
        assert_eq!(scorecard_key("r1"), "scorecard_r1");
        assert_eq!(OFFLINE_QUEUE_KEY, "@offline_queue");
        assert_eq!(OFFLINE_QUEUE_QUARANTINE_KEY, "@offline_queue_quarantine");
    }
}
