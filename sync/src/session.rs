//! One round being scored on the device.
//!
//! A [`ScorecardSession`] ties the pieces together the way the scoring screen
//! uses them: edits go to the in-memory scorecard and the debounced
//! persister, moving between holes flushes, and leaving a hole finalizes it
//! through the [`SubmissionRouter`].

use scorecard_engine::{CoursePars, HoleNumber, HoleScoreMap, PlayerId, RoundId, Strokes};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::loader::ScorecardLoader;
use crate::persister::{DebouncedPersister, SaveStatus};
use crate::router::{FinalizeOutcome, SubmissionRouter};
use crate::store::SharedKvStore;

/// Hole shown when a round is opened. Legacy scores are attributed to it.
pub const FIRST_HOLE: HoleNumber = 1;

/// Scoring state of a single round.
#[derive(Debug)]
pub struct ScorecardSession {
    round_id: RoundId,
    players: Vec<PlayerId>,
    pars: CoursePars,
    scores: HoleScoreMap,
    current_hole: HoleNumber,
    persister: DebouncedPersister,
    router: SubmissionRouter,
}

impl ScorecardSession {
    /// Open a round, loading (and if needed upgrading) its stored scorecard.
    pub async fn open(
        round_id: impl Into<RoundId>,
        players: Vec<PlayerId>,
        pars: CoursePars,
        store: SharedKvStore,
        router: SubmissionRouter,
        config: &SyncConfig,
    ) -> Self {
        let round_id = round_id.into();
        let scores = ScorecardLoader::new(store.clone())
            .load_round(&round_id, FIRST_HOLE)
            .await;
        let persister = DebouncedPersister::for_round(store, &round_id, config);

        tracing::info!(
            round_id = %round_id,
            players = players.len(),
            holes_scored = scores.len(),
            "scorecard opened"
        );

        Self {
            round_id,
            players,
            pars,
            scores,
            current_hole: FIRST_HOLE,
            persister,
            router,
        }
    }

    pub fn round_id(&self) -> &str {
        &self.round_id
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn current_hole(&self) -> HoleNumber {
        self.current_hole
    }

    pub fn hole_count(&self) -> HoleNumber {
        self.pars.hole_count()
    }

    pub fn scores(&self) -> &HoleScoreMap {
        &self.scores
    }

    /// Par of the hole on screen.
    pub fn current_par(&self) -> Strokes {
        self.pars.par_for(self.current_hole)
    }

    /// Set a player's strokes on the current hole.
    pub fn set_score(&mut self, player_id: &str, strokes: Strokes) {
        self.scores.set_score(self.current_hole, player_id, strokes);
        self.persister.notify_changed(self.scores.clone());
    }

    /// Remove a player's strokes from the current hole.
    pub fn clear_score(&mut self, player_id: &str) -> Option<Strokes> {
        let removed = self.scores.clear_score(self.current_hole, player_id);
        if removed.is_some() {
            self.persister.notify_changed(self.scores.clone());
        }
        removed
    }

    /// A player's strokes on the current hole.
    pub fn score(&self, player_id: &str) -> Option<Strokes> {
        self.scores.get_score(self.current_hole, player_id)
    }

    /// A player's running total against par over every scored hole.
    pub fn relative_to_par(&self, player_id: &str) -> Option<i64> {
        self.scores.cumulative_relative_to_par(player_id, self.pars.lookup())
    }

    pub fn save_status(&self) -> SaveStatus {
        self.persister.status()
    }

    pub fn watch_save_status(&self) -> watch::Receiver<SaveStatus> {
        self.persister.watch_status()
    }

    /// Go back one hole. Pending edits are written first.
    pub async fn previous_hole(&mut self) -> HoleNumber {
        self.persister.flush().await;
        if self.current_hole > FIRST_HOLE {
            self.current_hole -= 1;
        }
        self.current_hole
    }

    /// Leave the current hole: write pending edits, finalize the hole in the
    /// background, then advance unless this is the last hole.
    pub async fn next_hole(&mut self) -> JoinHandle<FinalizeOutcome> {
        self.persister.flush().await;

        let finalize = self.router.spawn_finalize(
            &self.round_id,
            self.current_hole,
            &self.players,
            &self.scores,
        );

        if self.current_hole < self.hole_count() {
            self.current_hole += 1;
        }
        finalize
    }

    /// Finalize the current hole and wait for the outcome, without moving.
    pub async fn finalize_current_hole(&mut self) -> FinalizeOutcome {
        self.persister.flush().await;
        self.router
            .finalize_hole(&self.round_id, self.current_hole, &self.players, &self.scores)
            .await
    }

    /// Write pending edits and stop persisting.
    pub async fn close(self) {
        self.persister.flush().await;
        self.persister.close();
        tracing::info!(round_id = %self.round_id, "scorecard closed");
    }
}
