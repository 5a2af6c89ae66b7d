//! Durable operation records and the retry state machine.
//!
//! Remote work that could not be performed while offline is expressed as a
//! [`QueueOperation`] and kept in an [`OperationQueue`] until it is applied or
//! evicted. This module holds no IO: ids and timestamps are passed in, and a
//! drain is modelled by [`DrainPass`], which the caller feeds with the outcome
//! of each remote attempt.
//!
//! Lifecycle of one operation:
//!
//! ```text
//! pending(retries = 0) --fail--> pending(1) --fail--> pending(2) --fail--> removed
//!        \                          \                    \
//!         +--success--> removed      +--success--> removed +--success--> removed
//! ```

use crate::{error::Result, Error, OperationId, RoundId, ScoreEntry, Timestamp};
use serde::{Deserialize, Serialize};

/// Failed attempts after which an operation is evicted.
pub const MAX_RETRIES: u32 = 3;

/// Kind of remote work an operation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Submit one hole's scores for a round.
    #[serde(rename = "SUBMIT_SCORES")]
    SubmitScores,
}

/// Payload of a [`OperationKind::SubmitScores`] operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoresData {
    /// Round the scores belong to
    pub round_id: RoundId,
    /// Scores in player-list order
    pub scores: Vec<ScoreEntry>,
}

impl SubmitScoresData {
    /// Create a new submit-scores payload.
    pub fn new(round_id: impl Into<RoundId>, scores: Vec<ScoreEntry>) -> Self {
        Self {
            round_id: round_id.into(),
            scores,
        }
    }
}

/// A persisted unit of pending remote work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueOperation {
    /// Unique id, sortable by creation
    pub id: OperationId,
    /// What the operation does
    #[serde(rename = "type")]
    pub kind: OperationKind,
    /// Payload for the remote call, kept opaque so older entries still load
    pub data: serde_json::Value,
    /// Creation time (milliseconds since epoch)
    pub timestamp: Timestamp,
    /// Failed attempts so far
    #[serde(default)]
    pub retries: u32,
}

/// What happens to an operation after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep it for the next drain, with the new retry count
    Retry { retries: u32 },
    /// Drop it permanently
    Evict,
}

impl QueueOperation {
    /// Create a new operation with zero retries.
    pub fn new(
        id: impl Into<OperationId>,
        kind: OperationKind,
        data: serde_json::Value,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            data,
            timestamp,
            retries: 0,
        }
    }

    /// Create a submit-scores operation.
    pub fn submit_scores(
        id: impl Into<OperationId>,
        data: &SubmitScoresData,
        timestamp: Timestamp,
    ) -> Result<Self> {
        let id = id.into();
        let data = serde_json::to_value(data).map_err(|e| Error::InvalidPayload {
            op_id: id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(id, OperationKind::SubmitScores, data, timestamp))
    }

    /// Decode the payload of a submit-scores operation.
    pub fn submit_scores_data(&self) -> Result<SubmitScoresData> {
        serde_json::from_value(self.data.clone()).map_err(|e| Error::InvalidPayload {
            op_id: self.id.clone(),
            reason: e.to_string(),
        })
    }

    /// Record a failed attempt.
    ///
    /// The counter is incremented first; reaching `max_retries` evicts. An
    /// entry already past the ceiling (from an older build) is evicted too.
    pub fn record_failure(&mut self, max_retries: u32) -> Disposition {
        self.retries = self.retries.saturating_add(1);
        if self.retries >= max_retries {
            Disposition::Evict
        } else {
            Disposition::Retry {
                retries: self.retries,
            }
        }
    }
}

/// Ordered queue of pending operations, oldest first.
///
/// Persisted as a single JSON array; the whole array is rewritten on every
/// mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationQueue {
    operations: Vec<QueueOperation>,
}

impl OperationQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Parse a persisted queue, failing on the first unreadable entry.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidQueue(e.to_string()))
    }

    /// Parse a persisted queue entry by entry.
    ///
    /// Entries that do not decode (unknown `type`, missing fields) are left
    /// out and reported; the rest keep their order. A blob that is not a
    /// JSON array yields an empty queue marked corrupt.
    pub fn recover(json: &str) -> RecoveredQueue {
        let entries: Vec<serde_json::Value> = match serde_json::from_str(json) {
            Ok(entries) => entries,
            Err(e) => {
                return RecoveredQueue {
                    corrupt: Some(e.to_string()),
                    ..RecoveredQueue::default()
                }
            }
        };

        let mut recovered = RecoveredQueue::default();
        for (index, entry) in entries.into_iter().enumerate() {
            let id = entry
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            match serde_json::from_value::<QueueOperation>(entry) {
                Ok(operation) => recovered.queue.push(operation),
                Err(e) => recovered.rejected.push(RejectedEntry {
                    id,
                    index,
                    reason: e.to_string(),
                }),
            }
        }
        recovered
    }

    /// Serialize for persistence.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidQueue(e.to_string()))
    }

    /// Append an operation at the end.
    pub fn push(&mut self, operation: QueueOperation) {
        self.operations.push(operation);
    }

    /// Number of pending operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterate operations in creation order.
    pub fn iter(&self) -> std::slice::Iter<'_, QueueOperation> {
        self.operations.iter()
    }

    /// Find an operation by id.
    pub fn get(&self, id: &str) -> Option<&QueueOperation> {
        self.operations.iter().find(|op| op.id == id)
    }
}

impl IntoIterator for OperationQueue {
    type Item = QueueOperation;
    type IntoIter = std::vec::IntoIter<QueueOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}

impl FromIterator<QueueOperation> for OperationQueue {
    fn from_iter<I: IntoIterator<Item = QueueOperation>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}

/// A persisted entry that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    /// Id of the entry, if it had a readable one
    pub id: Option<OperationId>,
    /// Position in the persisted array
    pub index: usize,
    /// Decode error
    pub reason: String,
}

/// A persisted queue read entry by entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoveredQueue {
    /// Entries that decoded, in persisted order
    pub queue: OperationQueue,
    /// Entries that did not
    pub rejected: Vec<RejectedEntry>,
    /// Set when the blob was not a JSON array at all
    pub corrupt: Option<String>,
}

impl RecoveredQueue {
    /// Whether the persisted blob decoded without losing anything.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.corrupt.is_none()
    }
}

/// Aggregate result of one drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    /// Operations applied and removed
    pub processed: usize,
    /// Failed attempts, evicted ones included
    pub failed: usize,
    /// Operations dropped for reaching the retry ceiling or for being
    /// unreadable
    pub evicted: Vec<OperationId>,
}

/// Bookkeeping for one walk over the queue.
///
/// Feed every operation, in order, to either [`DrainPass::succeeded`] or
/// [`DrainPass::failed`], then call [`DrainPass::finish`] for the queue to
/// persist and the report.
#[derive(Debug)]
pub struct DrainPass {
    max_retries: u32,
    kept: Vec<QueueOperation>,
    report: DrainReport,
}

impl DrainPass {
    /// Start a drain with the given retry ceiling.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            kept: Vec::new(),
            report: DrainReport::default(),
        }
    }

    /// The operation was applied remotely; it is dropped.
    pub fn succeeded(&mut self, _operation: QueueOperation) {
        self.report.processed += 1;
    }

    /// The remote attempt failed; retry later or evict.
    pub fn failed(&mut self, mut operation: QueueOperation) -> Disposition {
        self.report.failed += 1;
        let disposition = operation.record_failure(self.max_retries);
        match disposition {
            Disposition::Retry { .. } => self.kept.push(operation),
            Disposition::Evict => self.report.evicted.push(operation.id),
        }
        disposition
    }

    /// An entry that could not be decoded; it is dropped without an attempt.
    pub fn rejected(&mut self, entry: RejectedEntry) {
        if let Some(id) = entry.id {
            self.report.evicted.push(id);
        }
    }

    /// Finish the pass: the operations still owed, and the report.
    pub fn finish(self) -> (OperationQueue, DrainReport) {
        (
            OperationQueue {
                operations: self.kept,
            },
            self.report,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submit_op(id: &str, retries: u32) -> QueueOperation {
        let data = SubmitScoresData::new("r1", vec![ScoreEntry::new("p1", 1, 4)]);
        let mut op = QueueOperation::submit_scores(id, &data, 1_700_000_000_000).unwrap();
        op.retries = retries;
        op
    }

    #[test]
    fn new_operation_has_zero_retries() {
        let op = submit_op("op-1", 0);
        assert_eq!(op.retries, 0);
        assert_eq!(op.kind, OperationKind::SubmitScores);
    }

    #[test]
    fn persisted_format() {
        let queue: OperationQueue = vec![submit_op("op-1", 0)].into_iter().collect();
        let json = queue.to_json().unwrap();

        assert_eq!(
            json,
            r#"[{"id":"op-1","type":"SUBMIT_SCORES","data":{"roundId":"r1","scores":[{"playerId":"p1","holeNumber":1,"strokes":4}]},"timestamp":1700000000000,"retries":0}]"#
        );
        assert_eq!(OperationQueue::from_json(&json).unwrap(), queue);
    }

    #[test]
    fn opaque_data_from_older_entries_loads() {
        let queue = OperationQueue::from_json(
            r#"[{"id":"op-1","type":"SUBMIT_SCORES","data":{},"timestamp":1,"retries":0}]"#,
        )
        .unwrap();
        let op = queue.get("op-1").unwrap();

        assert_eq!(op.data, json!({}));
        assert!(matches!(
            op.submit_scores_data(),
            Err(Error::InvalidPayload { .. })
        ));
    }

    #[test]
    fn missing_retries_defaults_to_zero() {
        let queue = OperationQueue::from_json(
            r#"[{"id":"op-1","type":"SUBMIT_SCORES","data":{},"timestamp":1}]"#,
        )
        .unwrap();
        assert_eq!(queue.get("op-1").unwrap().retries, 0);
    }

    #[test]
    fn unknown_type_is_invalid_queue() {
        let result = OperationQueue::from_json(
            r#"[{"id":"op-1","type":"DELETE_ROUND","data":{},"timestamp":1,"retries":0}]"#,
        );
        assert!(matches!(result, Err(Error::InvalidQueue(_))));
    }

    #[test]
    fn recover_skips_unreadable_entries_in_place() {
        let json = json!([
            submit_op("op-1", 0),
            {"id": "op-2", "type": "DELETE_ROUND", "data": {}, "timestamp": 1},
            {"type": "SUBMIT_SCORES", "data": {}},
            submit_op("op-4", 2),
        ])
        .to_string();

        let recovered = OperationQueue::recover(&json);

        assert!(!recovered.is_clean());
        assert!(recovered.corrupt.is_none());
        let ids: Vec<_> = recovered.queue.iter().map(|op| op.id.as_str()).collect();
        assert_eq!(ids, vec!["op-1", "op-4"]);
        assert_eq!(recovered.queue.get("op-4").unwrap().retries, 2);

        let rejected: Vec<_> = recovered
            .rejected
            .iter()
            .map(|entry| (entry.id.clone(), entry.index))
            .collect();
        assert_eq!(rejected, vec![(Some("op-2".to_string()), 1), (None, 2)]);
    }

    #[test]
    fn recover_marks_non_array_blob_corrupt() {
        for raw in ["not json", "{}", "null", "[1,"] {
            let recovered = OperationQueue::recover(raw);
            assert!(recovered.queue.is_empty());
            assert!(recovered.corrupt.is_some(), "{raw} should be corrupt");
        }
        assert!(OperationQueue::recover("[]").is_clean());
    }

    #[test]
    fn rejected_entries_are_reported_as_evicted() {
        let mut pass = DrainPass::new(MAX_RETRIES);
        pass.succeeded(submit_op("op-1", 0));
        pass.rejected(RejectedEntry {
            id: Some("op-2".into()),
            index: 1,
            reason: "unknown variant".into(),
        });
        pass.rejected(RejectedEntry {
            id: None,
            index: 2,
            reason: "missing field `id`".into(),
        });

        let (queue, report) = pass.finish();
        assert!(queue.is_empty());
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.evicted, vec!["op-2".to_string()]);
    }

    #[test]
    fn record_failure_walks_to_eviction() {
        let mut op = submit_op("op-1", 0);
        assert_eq!(op.record_failure(MAX_RETRIES), Disposition::Retry { retries: 1 });
        assert_eq!(op.record_failure(MAX_RETRIES), Disposition::Retry { retries: 2 });
        assert_eq!(op.record_failure(MAX_RETRIES), Disposition::Evict);
    }

    #[test]
    fn entry_past_ceiling_is_evicted_on_failure() {
        let mut op = submit_op("op-1", 3);
        assert_eq!(op.record_failure(MAX_RETRIES), Disposition::Evict);
    }

    #[test]
    fn drain_pass_keeps_order_and_counts() {
        let mut pass = DrainPass::new(MAX_RETRIES);
        pass.failed(submit_op("op-1", 0));
        pass.succeeded(submit_op("op-2", 1));
        pass.failed(submit_op("op-3", 2));
        pass.failed(submit_op("op-4", 1));

        let (queue, report) = pass.finish();
        let ids: Vec<_> = queue.iter().map(|op| op.id.as_str()).collect();

        assert_eq!(ids, vec!["op-1", "op-4"]);
        assert_eq!(queue.get("op-1").unwrap().retries, 1);
        assert_eq!(queue.get("op-4").unwrap().retries, 2);
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 3);
        assert_eq!(report.evicted, vec!["op-3".to_string()]);
    }
}
