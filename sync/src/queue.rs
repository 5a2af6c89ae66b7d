//! Persistent FIFO of remote work owed while offline.
//!
//! The whole queue is one JSON array under [`OFFLINE_QUEUE_KEY`]. Each
//! mutation loads it, changes it and writes it back; mutations are serialized
//! so a drain's write-back never drops an operation appended meanwhile.
//!
//! Entries that no longer decode are dropped on the next write, and the blob
//! they came from is copied to [`OFFLINE_QUEUE_QUARANTINE_KEY`] first.

use std::fmt::Display;
use std::future::Future;

use scorecard_engine::{
    Disposition, DrainPass, DrainReport, OperationKind, OperationQueue, QueueOperation,
    RecoveredQueue, SubmitScoresData, MAX_RETRIES,
};
use tokio::sync::Mutex;

use crate::error::SyncResult;
use crate::store::{SharedKvStore, OFFLINE_QUEUE_KEY, OFFLINE_QUEUE_QUARANTINE_KEY};

/// Generate a new operation id, sortable by creation time.
pub fn next_operation_id() -> String {
    format!("op-{}", uuid::Uuid::now_v7())
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Durable operation queue.
pub struct OfflineQueue {
    store: SharedKvStore,
    key: String,
    max_retries: u32,
    lock: Mutex<()>,
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("key", &self.key)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl OfflineQueue {
    /// Create a queue persisted under the default key.
    pub fn new(store: SharedKvStore) -> Self {
        Self {
            store,
            key: OFFLINE_QUEUE_KEY.to_string(),
            max_retries: MAX_RETRIES,
            lock: Mutex::new(()),
        }
    }

    /// Override the retry ceiling.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Retry ceiling in use.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    async fn read(&self) -> SyncResult<Option<(String, RecoveredQueue)>> {
        Ok(self.store.get(&self.key).await?.map(|raw| {
            let recovered = OperationQueue::recover(&raw);
            (raw, recovered)
        }))
    }

    async fn load(&self) -> SyncResult<OperationQueue> {
        Ok(self
            .read()
            .await?
            .map(|(_, recovered)| recovered.queue)
            .unwrap_or_default())
    }

    /// Load ahead of a write-back. If any entry is unreadable the stored blob
    /// is copied to the quarantine key before it gets overwritten.
    async fn load_for_write(&self) -> SyncResult<RecoveredQueue> {
        let Some((raw, recovered)) = self.read().await? else {
            return Ok(RecoveredQueue::default());
        };
        if recovered.is_clean() {
            return Ok(recovered);
        }

        if let Some(reason) = &recovered.corrupt {
            tracing::warn!(error = %reason, "offline queue is not a JSON array, starting empty");
        }
        for entry in &recovered.rejected {
            tracing::warn!(
                op_id = ?entry.id,
                index = entry.index,
                error = %entry.reason,
                "dropping unreadable queued operation"
            );
        }
        self.store.set(OFFLINE_QUEUE_QUARANTINE_KEY, raw).await?;

        Ok(recovered)
    }

    async fn save(&self, queue: &OperationQueue) -> SyncResult<()> {
        let json = queue.to_json()?;
        self.store.set(&self.key, json).await?;
        Ok(())
    }

    /// Append an operation with a fresh id, the current time and zero retries.
    pub async fn append(
        &self,
        kind: OperationKind,
        data: serde_json::Value,
    ) -> SyncResult<QueueOperation> {
        let operation = QueueOperation::new(next_operation_id(), kind, data, now_millis());
        self.push(operation).await
    }

    /// Append a submit-scores operation.
    pub async fn append_submit_scores(&self, data: &SubmitScoresData) -> SyncResult<QueueOperation> {
        let operation = QueueOperation::submit_scores(next_operation_id(), data, now_millis())?;
        self.push(operation).await
    }

    async fn push(&self, operation: QueueOperation) -> SyncResult<QueueOperation> {
        let _guard = self.lock.lock().await;

        let mut queue = self.load_for_write().await?.queue;
        queue.push(operation.clone());
        self.save(&queue).await?;

        tracing::info!(
            op_id = %operation.id,
            kind = ?operation.kind,
            queued = queue.len(),
            "operation queued"
        );

        Ok(operation)
    }

    /// Attempt every queued operation in order.
    ///
    /// Successes are removed. Failures are retried on a later drain until the
    /// retry ceiling, then evicted. Unreadable entries are evicted without an
    /// attempt. The updated queue is written once, and only if there was
    /// something to change. Never fails: load and write-back errors are
    /// logged.
    pub async fn drain<F, Fut, E>(&self, mut handler: F) -> DrainReport
    where
        F: FnMut(QueueOperation) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let _guard = self.lock.lock().await;

        let recovered = match self.load_for_write().await {
            Ok(recovered) => recovered,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load offline queue");
                return DrainReport::default();
            }
        };

        if recovered.is_clean() && recovered.queue.is_empty() {
            return DrainReport::default();
        }

        let RecoveredQueue { queue, rejected, .. } = recovered;

        let mut pass = DrainPass::new(self.max_retries);
        for entry in rejected {
            pass.rejected(entry);
        }

        tracing::info!(pending = queue.len(), "draining offline queue");

        for operation in queue {
            match handler(operation.clone()).await {
                Ok(()) => {
                    tracing::debug!(op_id = %operation.id, "queued operation applied");
                    pass.succeeded(operation);
                }
                Err(e) => {
                    let op_id = operation.id.clone();
                    match pass.failed(operation) {
                        Disposition::Retry { retries } => {
                            tracing::debug!(op_id = %op_id, retries, error = %e, "queued operation failed");
                        }
                        Disposition::Evict => {
                            tracing::warn!(op_id = %op_id, error = %e, "queued operation evicted after max retries");
                        }
                    }
                }
            }
        }

        let (remaining, report) = pass.finish();
        if let Err(e) = self.save(&remaining).await {
            tracing::warn!(error = %e, "failed to persist offline queue after drain");
        }

        tracing::info!(
            processed = report.processed,
            failed = report.failed,
            evicted = report.evicted.len(),
            remaining = remaining.len(),
            "offline queue drained"
        );

        report
    }

    /// Operations currently queued, oldest first.
    pub async fn pending(&self) -> SyncResult<Vec<QueueOperation>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().collect())
    }

    /// Number of queued operations.
    pub async fn len(&self) -> SyncResult<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.len())
    }

    /// Whether nothing is queued.
    pub async fn is_empty(&self) -> SyncResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove every queued operation.
    pub async fn clear(&self) -> SyncResult<()> {
        let _guard = self.lock.lock().await;
        self.store.remove(&self.key).await?;
        tracing::info!("offline queue cleared");
        Ok(())
    }
}
