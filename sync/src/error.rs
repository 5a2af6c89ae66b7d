//! Unified error handling for the sync runtime.

use crate::remote::RemoteError;
use crate::store::StorageError;

/// Sync runtime error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Engine error: {0}")]
    Engine(#[from] scorecard_engine::Error),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
