//! Error types for the scorecard engine.

use crate::OperationId;
use thiserror::Error;

/// All possible errors from the scorecard engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Persisted data errors
    #[error("invalid scorecard: {0}")]
    InvalidScorecard(String),

    #[error("invalid queue: {0}")]
    InvalidQueue(String),

    // Operation errors
    #[error("invalid payload for operation {op_id}: {reason}")]
    InvalidPayload { op_id: OperationId, reason: String },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
