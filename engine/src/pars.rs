//! Course pars used for relative-to-par totals.

use crate::{HoleNumber, Strokes};
use serde::{Deserialize, Serialize};

/// Par assumed for a hole the course layout does not describe.
pub const DEFAULT_PAR: Strokes = 3;

/// Hole count assumed when the course layout is unknown.
pub const DEFAULT_HOLE_COUNT: HoleNumber = 18;

/// Per-hole pars for a course, hole `n` at index `n - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoursePars {
    pars: Vec<Strokes>,
}

impl CoursePars {
    /// Create pars from the course layout in hole order.
    pub fn new(pars: Vec<Strokes>) -> Self {
        Self { pars }
    }

    /// A course whose layout is unknown: 18 holes of par 3.
    pub fn unknown() -> Self {
        Self { pars: Vec::new() }
    }

    /// Par for a hole, falling back to [`DEFAULT_PAR`].
    ///
    /// A par of zero in the layout is treated as missing.
    pub fn par_for(&self, hole: HoleNumber) -> Strokes {
        hole.checked_sub(1)
            .and_then(|index| self.pars.get(index as usize))
            .copied()
            .filter(|par| *par > 0)
            .unwrap_or(DEFAULT_PAR)
    }

    /// Number of holes on the course.
    pub fn hole_count(&self) -> HoleNumber {
        if self.pars.is_empty() {
            DEFAULT_HOLE_COUNT
        } else {
            self.pars.len() as HoleNumber
        }
    }

    /// Par lookup in the shape [`crate::HoleScoreMap::cumulative_relative_to_par`] takes.
    pub fn lookup(&self) -> impl Fn(HoleNumber) -> i64 + '_ {
        move |hole| i64::from(self.par_for(hole))
    }
}
