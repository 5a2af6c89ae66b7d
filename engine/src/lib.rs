//! # Scorecard Engine
//!
//! Deterministic core of the offline-tolerant scorecard sync.
//!
//! This crate holds the data model and decision logic for recording disc-golf
//! scores on a device with intermittent connectivity. It has no IO: the
//! `scorecard-sync` crate wires it to storage, the network and a runtime.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of files, network, or platform
//! - **Deterministic**: ids and timestamps are inputs, never generated here
//! - **Backward compatible**: scorecards persisted by older builds still load
//!
//! ## Core Concepts
//!
//! ### Hole-indexed scores
//!
//! A round's scores live in a [`HoleScoreMap`]: hole number to per-player
//! strokes. It is sparse, and [`HoleScoreMap::cumulative_relative_to_par`]
//! distinguishes "no score yet" (`None`) from "even par" (`Some(0)`).
//!
//! ### Migration
//!
//! [`migrate::upgrade`] reads a persisted blob. The legacy flat
//! `{playerId: strokes}` form is wrapped under the active hole and flagged for
//! rewrite; the current form is returned as-is.
//!
//! ### Durable operations
//!
//! Work owed to the remote API is a [`QueueOperation`]. A drain walks the
//! [`OperationQueue`] through a [`DrainPass`]: successes are dropped, failures
//! are retried until [`MAX_RETRIES`] and then evicted.
//!
//! ## Quick Start
//!
//! ```rust
//! use scorecard_engine::{migrate, CoursePars, HoleScoreMap};
//!
//! // A legacy blob stored before scores had a hole dimension
//! let upgrade = migrate::upgrade(r#"{"p1":4,"p2":3}"#, 1).unwrap();
//! assert!(upgrade.needs_rewrite());
//!
//! let mut scores: HoleScoreMap = upgrade.scores;
//! scores.set_score(2, "p1", 2);
//!
//! let pars = CoursePars::new(vec![3, 3, 4]);
//! assert_eq!(scores.cumulative_relative_to_par("p1", pars.lookup()), Some(0));
//! assert_eq!(scores.cumulative_relative_to_par("p3", pars.lookup()), None);
//!
//! let submission = scores.hole_submission(1, &["p2", "p1"]).unwrap();
//! assert_eq!(submission[0].player_id, "p2");
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module provides C-compatible functions for the mobile host.
//! All data is exchanged as JSON strings.

pub mod error;
pub mod ffi;
pub mod migrate;
pub mod pars;
pub mod queue;
pub mod scores;

// Re-export main types at crate root
pub use error::Error;
pub use migrate::{StoredFormat, Upgrade};
pub use pars::{CoursePars, DEFAULT_HOLE_COUNT, DEFAULT_PAR};
pub use queue::{
    Disposition, DrainPass, DrainReport, OperationKind, OperationQueue, QueueOperation,
    RecoveredQueue, RejectedEntry, SubmitScoresData, MAX_RETRIES,
};
pub use scores::{HoleScoreMap, PlayerScores, ScoreEntry};

/// Type aliases for clarity
pub type PlayerId = String;
pub type RoundId = String;
pub type OperationId = String;
pub type HoleNumber = u32;
pub type Strokes = u32;
pub type Timestamp = u64;
