//! Loading persisted scorecards, upgrading legacy blobs in place.

use scorecard_engine::{migrate, HoleNumber, HoleScoreMap};

use crate::error::SyncResult;
use crate::store::{scorecard_key, SharedKvStore};

/// Reads scorecards from the store.
///
/// A legacy flat blob is attributed to the hole active at load time and the
/// upgraded form is written back under the same key before it is returned.
#[derive(Clone)]
pub struct ScorecardLoader {
    store: SharedKvStore,
}

impl ScorecardLoader {
    pub fn new(store: SharedKvStore) -> Self {
        Self { store }
    }

    /// Load the scorecard stored under `key`.
    ///
    /// Absent key yields an empty map. Unreadable blobs are errors. A failed
    /// write-back of an upgraded blob is logged and the upgraded map is still
    /// returned; the next load upgrades it again.
    pub async fn try_load(&self, key: &str, active_hole: HoleNumber) -> SyncResult<HoleScoreMap> {
        let Some(raw) = self.store.get(key).await? else {
            tracing::debug!(key = %key, "no stored scorecard");
            return Ok(HoleScoreMap::new());
        };

        let upgrade = migrate::upgrade(&raw, active_hole)?;

        if !upgrade.discarded.is_empty() {
            tracing::warn!(
                key = %key,
                discarded = ?upgrade.discarded,
                "dropped unreadable scorecard entries"
            );
        }

        if upgrade.needs_rewrite() {
            tracing::info!(key = %key, active_hole, "upgrading legacy scorecard");
            let json = upgrade.scores.to_json()?;
            if let Err(e) = self.store.set(key, json).await {
                tracing::warn!(key = %key, error = %e, "failed to persist upgraded scorecard");
            }
        }

        Ok(upgrade.scores)
    }

    /// Load the scorecard stored under `key`, starting empty on any failure.
    pub async fn load(&self, key: &str, active_hole: HoleNumber) -> HoleScoreMap {
        match self.try_load(key, active_hole).await {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to load scorecard, starting empty");
                HoleScoreMap::new()
            }
        }
    }

    /// Load a round's scorecard.
    pub async fn load_round(&self, round_id: &str, active_hole: HoleNumber) -> HoleScoreMap {
        self.load(&scorecard_key(round_id), active_hole).await
    }
}
