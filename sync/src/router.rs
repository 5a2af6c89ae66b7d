//! Routing of finalized holes to the remote API or the offline queue.

use std::sync::Arc;

use scorecard_engine::{HoleNumber, HoleScoreMap, OperationId, ScoreEntry, SubmitScoresData};
use tokio::task::JoinHandle;

use crate::network::NetworkMonitor;
use crate::queue::OfflineQueue;
use crate::remote::RemoteScores;

/// What happened to a finalized hole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The hole was incomplete; nothing was sent or queued
    Skipped,
    /// Submitted to the remote API
    Submitted,
    /// The remote submission failed and was dropped
    SubmitFailed,
    /// Queued for the next time the device is online
    Queued(OperationId),
    /// Queuing failed and the scores only remain in the local scorecard
    QueueFailed,
}

/// Sends a completed hole's scores to the right place.
#[derive(Clone)]
pub struct SubmissionRouter {
    monitor: Arc<NetworkMonitor>,
    remote: Arc<dyn RemoteScores>,
    queue: Arc<OfflineQueue>,
}

impl std::fmt::Debug for SubmissionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionRouter")
            .field("monitor", &self.monitor)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl SubmissionRouter {
    pub fn new(
        monitor: Arc<NetworkMonitor>,
        remote: Arc<dyn RemoteScores>,
        queue: Arc<OfflineQueue>,
    ) -> Self {
        Self {
            monitor,
            remote,
            queue,
        }
    }

    /// Submit or queue the scores of `hole`.
    ///
    /// Only a hole where every player has a score is routed. Never fails;
    /// the outcome is informational.
    pub async fn finalize_hole<P: AsRef<str>>(
        &self,
        round_id: &str,
        hole: HoleNumber,
        players: &[P],
        scores: &HoleScoreMap,
    ) -> FinalizeOutcome {
        let Some(entries) = scores.hole_submission(hole, players) else {
            tracing::debug!(round_id = %round_id, hole, "hole incomplete, not submitting");
            return FinalizeOutcome::Skipped;
        };

        let online = self.monitor.current_state();
        self.route(round_id.to_string(), hole, entries, online).await
    }

    /// Fire-and-forget form of [`finalize_hole`](Self::finalize_hole).
    ///
    /// The completeness check and the connectivity reading happen before the
    /// task is spawned.
    pub fn spawn_finalize<P: AsRef<str>>(
        &self,
        round_id: &str,
        hole: HoleNumber,
        players: &[P],
        scores: &HoleScoreMap,
    ) -> JoinHandle<FinalizeOutcome> {
        let entries = scores.hole_submission(hole, players);
        let online = self.monitor.current_state();
        let router = self.clone();
        let round_id = round_id.to_string();

        tokio::spawn(async move {
            match entries {
                Some(entries) => router.route(round_id, hole, entries, online).await,
                None => {
                    tracing::debug!(round_id = %round_id, hole, "hole incomplete, not submitting");
                    FinalizeOutcome::Skipped
                }
            }
        })
    }

    async fn route(
        &self,
        round_id: String,
        hole: HoleNumber,
        entries: Vec<ScoreEntry>,
        online: bool,
    ) -> FinalizeOutcome {
        if online {
            match self.remote.submit_scores(&round_id, entries).await {
                Ok(()) => {
                    tracing::info!(round_id = %round_id, hole, "hole submitted");
                    FinalizeOutcome::Submitted
                }
                Err(e) => {
                    tracing::warn!(round_id = %round_id, hole, error = %e, "hole submission failed");
                    FinalizeOutcome::SubmitFailed
                }
            }
        } else {
            let data = SubmitScoresData::new(round_id.clone(), entries);
            match self.queue.append_submit_scores(&data).await {
                Ok(operation) => {
                    tracing::info!(round_id = %round_id, hole, op_id = %operation.id, "offline, hole queued");
                    FinalizeOutcome::Queued(operation.id)
                }
                Err(e) => {
                    tracing::warn!(round_id = %round_id, hole, error = %e, "failed to queue hole");
                    FinalizeOutcome::QueueFailed
                }
            }
        }
    }
}
