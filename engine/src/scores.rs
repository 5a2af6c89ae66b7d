//! Hole-indexed score map - the local score cache for one round.
//!
//! The map is the source of truth for the UI. It is sparse: a round may carry
//! scores for hole 1 and hole 5 with nothing in between.

use crate::{error::Result, Error, HoleNumber, PlayerId, Strokes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strokes recorded on one hole, keyed by player.
pub type PlayerScores = BTreeMap<PlayerId, Strokes>;

/// A single stroke count for one player on one hole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    /// Player the score belongs to
    pub player_id: PlayerId,
    /// Hole the score was recorded on
    pub hole_number: HoleNumber,
    /// Number of strokes
    pub strokes: Strokes,
}

impl ScoreEntry {
    /// Create a new score entry.
    pub fn new(player_id: impl Into<PlayerId>, hole_number: HoleNumber, strokes: Strokes) -> Self {
        Self {
            player_id: player_id.into(),
            hole_number,
            strokes,
        }
    }
}

/// Mapping from hole number to per-player strokes.
///
/// Serializes as `{"1":{"player-1":4},"2":{"player-1":5}}`. `BTreeMap` keeps
/// the on-disk form stable between writes of the same scores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoleScoreMap {
    holes: BTreeMap<HoleNumber, PlayerScores>,
}

impl HoleScoreMap {
    /// Create an empty score map.
    pub fn new() -> Self {
        Self {
            holes: BTreeMap::new(),
        }
    }

    /// Record strokes for a player on a hole, replacing any previous value.
    pub fn set_score(&mut self, hole: HoleNumber, player_id: impl Into<PlayerId>, strokes: Strokes) {
        self.holes
            .entry(hole)
            .or_default()
            .insert(player_id.into(), strokes);
    }

    /// Get the strokes a player recorded on a hole.
    pub fn get_score(&self, hole: HoleNumber, player_id: &str) -> Option<Strokes> {
        self.holes.get(&hole)?.get(player_id).copied()
    }

    /// Remove a player's score for a hole.
    ///
    /// A hole left without any score is dropped from the map.
    pub fn clear_score(&mut self, hole: HoleNumber, player_id: &str) -> Option<Strokes> {
        let scores = self.holes.get_mut(&hole)?;
        let removed = scores.remove(player_id);
        if scores.is_empty() {
            self.holes.remove(&hole);
        }
        removed
    }

    /// Replace every score recorded for a hole.
    pub fn insert_hole(&mut self, hole: HoleNumber, scores: PlayerScores) {
        self.holes.insert(hole, scores);
    }

    /// Scores recorded for one hole.
    pub fn hole_scores(&self, hole: HoleNumber) -> Option<&PlayerScores> {
        self.holes.get(&hole)
    }

    /// Iterate holes in ascending order.
    pub fn holes(&self) -> impl Iterator<Item = (HoleNumber, &PlayerScores)> {
        self.holes.iter().map(|(hole, scores)| (*hole, scores))
    }

    /// Number of holes carrying at least one entry.
    pub fn len(&self) -> usize {
        self.holes.len()
    }

    /// Check if no hole has been scored.
    pub fn is_empty(&self) -> bool {
        self.holes.is_empty()
    }

    /// Sum of `strokes - par` over every hole the player has a score for.
    ///
    /// Returns `None` when the player has no recorded score at all, which is
    /// different from `Some(0)` (even par). Every hole in the map counts, not
    /// only the ones before the hole on screen.
    pub fn cumulative_relative_to_par<F>(&self, player_id: &str, par_for: F) -> Option<i64>
    where
        F: Fn(HoleNumber) -> i64,
    {
        let mut total = None;
        for (hole, scores) in &self.holes {
            if let Some(strokes) = scores.get(player_id) {
                *total.get_or_insert(0) += i64::from(*strokes) - par_for(*hole);
            }
        }
        total
    }

    /// Total strokes recorded for a player, or `None` without any score.
    pub fn total_strokes(&self, player_id: &str) -> Option<u64> {
        let mut total = None;
        for scores in self.holes.values() {
            if let Some(strokes) = scores.get(player_id) {
                *total.get_or_insert(0) += u64::from(*strokes);
            }
        }
        total
    }

    /// Build the submission for one hole, in player-list order.
    ///
    /// Returns `None` if the player list is empty or any player has no score
    /// on the hole; partial holes are never submitted.
    pub fn hole_submission<P: AsRef<str>>(
        &self,
        hole: HoleNumber,
        players: &[P],
    ) -> Option<Vec<ScoreEntry>> {
        if players.is_empty() {
            return None;
        }
        let scores = self.holes.get(&hole)?;
        players
            .iter()
            .map(|player| {
                let player = player.as_ref();
                scores
                    .get(player)
                    .map(|strokes| ScoreEntry::new(player, hole, *strokes))
            })
            .collect()
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidScorecard(e.to_string()))
    }
}

impl FromIterator<ScoreEntry> for HoleScoreMap {
    fn from_iter<I: IntoIterator<Item = ScoreEntry>>(iter: I) -> Self {
        let mut map = HoleScoreMap::new();
        for entry in iter {
            map.set_score(entry.hole_number, entry.player_id, entry.strokes);
        }
        map
    }
}
