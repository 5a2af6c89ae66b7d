//! Property and edge case tests for scorecard-engine
//!
//! These tests exercise the score map, migration and queue state machine
//! through the public API only.

use proptest::prelude::*;
use scorecard_engine::{
    migrate, CoursePars, Disposition, DrainPass, HoleNumber, HoleScoreMap, OperationQueue,
    QueueOperation, ScoreEntry, StoredFormat, SubmitScoresData, MAX_RETRIES,
};
use std::collections::BTreeMap;

const PLAYERS: [&str; 3] = ["p1", "p2", "p3"];

fn course() -> CoursePars {
    CoursePars::new(vec![3, 4, 5, 3, 3, 4, 3, 5, 3])
}

// ============================================================================
// Relative to par
// ============================================================================

proptest! {
    #[test]
    fn relative_to_par_sums_exactly_the_scored_holes(
        edits in prop::collection::vec((1u32..=12, 0usize..PLAYERS.len(), 1u32..=9), 0..60)
    ) {
        let pars = course();
        let mut map = HoleScoreMap::new();
        let mut model: BTreeMap<(HoleNumber, &str), u32> = BTreeMap::new();

        for (hole, player, strokes) in edits {
            map.set_score(hole, PLAYERS[player], strokes);
            model.insert((hole, PLAYERS[player]), strokes);
        }

        for player in PLAYERS {
            let scored: Vec<_> = model
                .iter()
                .filter(|((_, p), _)| *p == player)
                .map(|((hole, _), strokes)| i64::from(*strokes) - i64::from(pars.par_for(*hole)))
                .collect();

            let expected = if scored.is_empty() {
                None
            } else {
                Some(scored.iter().sum::<i64>())
            };

            prop_assert_eq!(map.cumulative_relative_to_par(player, pars.lookup()), expected);
        }
    }

    #[test]
    fn nested_blobs_survive_upgrade_unchanged(
        edits in prop::collection::vec((1u32..=18, 0usize..PLAYERS.len(), 1u32..=9), 1..30)
    ) {
        let mut map = HoleScoreMap::new();
        for (hole, player, strokes) in edits {
            map.set_score(hole, PLAYERS[player], strokes);
        }

        let upgrade = migrate::upgrade(&map.to_json().unwrap(), 1).unwrap();
        prop_assert_eq!(upgrade.format, StoredFormat::HoleIndexed);
        prop_assert!(!upgrade.needs_rewrite());
        prop_assert_eq!(upgrade.scores, map);
    }
}

#[test]
fn clearing_last_score_returns_to_none() {
    let mut map = HoleScoreMap::new();
    map.set_score(4, "p1", 3);
    map.clear_score(4, "p1");

    assert_eq!(map.cumulative_relative_to_par("p1", course().lookup()), None);
}

#[test]
fn scores_collect_from_entries() {
    let map: HoleScoreMap = vec![
        ScoreEntry::new("p1", 1, 4),
        ScoreEntry::new("p2", 1, 3),
        ScoreEntry::new("p1", 2, 5),
    ]
    .into_iter()
    .collect();

    assert_eq!(map.len(), 2);
    assert_eq!(map.get_score(2, "p1"), Some(5));
}

// ============================================================================
// Migration
// ============================================================================

#[test]
fn legacy_upgrade_then_reload_is_stable() {
    let first = migrate::upgrade(r#"{"p1":4,"p2":3}"#, 1).unwrap();
    assert!(first.needs_rewrite());

    let rewritten = first.scores.to_json().unwrap();
    assert_eq!(rewritten, r#"{"1":{"p1":4,"p2":3}}"#);

    let second = migrate::upgrade(&rewritten, 5).unwrap();
    assert!(!second.needs_rewrite());
    assert_eq!(second.scores, first.scores);
}

#[test]
fn large_stroke_counts_are_discarded() {
    let upgrade = migrate::upgrade(r#"{"1":{"p1":99999999999}}"#, 1).unwrap();
    assert!(upgrade.scores.is_empty());
    assert_eq!(upgrade.discarded.len(), 1);
}

// ============================================================================
// Queue
// ============================================================================

fn op(id: &str) -> QueueOperation {
    let data = SubmitScoresData::new("round-1", vec![ScoreEntry::new("p1", 1, 4)]);
    QueueOperation::submit_scores(id, &data, 1_000).unwrap()
}

#[test]
fn three_failed_drains_evict() {
    let mut queue: OperationQueue = vec![op("op-1")].into_iter().collect();

    for round in 1..=MAX_RETRIES {
        let mut pass = DrainPass::new(MAX_RETRIES);
        for operation in queue {
            let disposition = pass.failed(operation);
            if round < MAX_RETRIES {
                assert_eq!(disposition, Disposition::Retry { retries: round });
            } else {
                assert_eq!(disposition, Disposition::Evict);
            }
        }
        let (next, report) = pass.finish();
        assert_eq!(report.failed, 1);
        queue = next;
    }

    assert!(queue.is_empty());
}

#[test]
fn success_at_any_retry_count_removes() {
    let mut retried = op("op-1");
    retried.retries = 2;

    let mut pass = DrainPass::new(MAX_RETRIES);
    pass.succeeded(retried);
    let (queue, report) = pass.finish();

    assert!(queue.is_empty());
    assert_eq!(report.processed, 1);
    assert!(report.evicted.is_empty());
}

#[test]
fn queue_order_survives_persistence() {
    let queue: OperationQueue = ["op-1", "op-2", "op-3"].into_iter().map(op).collect();
    let restored = OperationQueue::from_json(&queue.to_json().unwrap()).unwrap();

    let ids: Vec<_> = restored.iter().map(|op| op.id.clone()).collect();
    assert_eq!(ids, vec!["op-1", "op-2", "op-3"]);
}

#[test]
fn payload_decodes_back() {
    let operation = op("op-1");
    let data = operation.submit_scores_data().unwrap();
    assert_eq!(data.round_id, "round-1");
    assert_eq!(data.scores, vec![ScoreEntry::new("p1", 1, 4)]);
}
