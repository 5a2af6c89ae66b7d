//! Automatic drain of the offline queue when connectivity returns.

use std::sync::Arc;

use scorecard_engine::{DrainReport, QueueOperation};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::network::{NetworkMonitor, Subscription};
use crate::queue::OfflineQueue;
use crate::remote::{RemoteError, RemoteScores};

/// Drain `queue` once, submitting each operation through `remote`.
pub async fn drain_with_remote(queue: &OfflineQueue, remote: &dyn RemoteScores) -> DrainReport {
    queue
        .drain(|operation: QueueOperation| {
            let submission = operation
                .submit_scores_data()
                .map(|data| remote.submit_scores(&data.round_id, data.scores));
            async move {
                match submission {
                    Ok(submit) => submit.await,
                    Err(e) => Err(RemoteError::Validation(e.to_string())),
                }
            }
        })
        .await
}

/// Drains the queue on every transition into online.
///
/// Transitions reach the drain task over a channel, so the monitor's
/// callback never blocks and drains never overlap.
pub struct QueueDrainer {
    subscription: Subscription,
    task: JoinHandle<()>,
}

impl QueueDrainer {
    /// Subscribe to `monitor` and start the drain task.
    pub fn spawn(
        monitor: &Arc<NetworkMonitor>,
        queue: Arc<OfflineQueue>,
        remote: Arc<dyn RemoteScores>,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<bool>();

        let subscription = monitor.subscribe(move |online| {
            let _ = tx.send(online);
        });

        let task = tokio::spawn(async move {
            while let Some(online) = rx.recv().await {
                if !online {
                    continue;
                }
                tracing::debug!("back online, draining offline queue");
                drain_with_remote(&queue, remote.as_ref()).await;
            }
            tracing::debug!("queue drainer stopped");
        });

        Self { subscription, task }
    }

    /// Unsubscribe and wait for any drain in progress to finish.
    pub async fn shutdown(self) {
        let QueueDrainer { subscription, task } = self;
        // Dropping the subscription removes the callback and with it the only
        // sender, which ends the task.
        drop(subscription);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "queue drainer task failed");
        }
    }
}
