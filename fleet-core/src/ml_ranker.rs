//! Lightweight arc-ranking heuristic ("ML arc ranker"), used only to break
//! ties between feasibility arcs of otherwise-equal travel weight.
//!
//! This is a fixed logistic-regression-shaped scorer, not a model trained
//! on held-out data: its "labels" would be the very feasibility check it is
//! meant to accelerate, so treating it as anything beyond a heuristic
//! tie-breaker would be circular. It never changes whether an arc exists,
//! and the nudge it contributes is scaled far below any real travel-weight
//! difference, so it can reorder which of several tied maximum-weight
//! matchings the solver lands on but can never change the matching's value.

use crate::model::{Job, RouteKind};
use fleet_heuristics::Float;

/// Features computed for one candidate arc `i -> j`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcFeatures {
    pub travel_min: Float,
    pub gap_min: Float,
    pub same_school: bool,
    pub route_type_match: bool,
    pub duration_ratio: Float,
}

impl ArcFeatures {
    pub fn compute(i: &Job, j: &Job, travel_min: Float) -> Self {
        let gap_min = (j.anchor_time_min - (i.anchor_time_min + i.duration_min) - travel_min).max(0.0);
        let duration_ratio = if j.duration_min > 0.0 { i.duration_min / j.duration_min } else { 1.0 };
        ArcFeatures {
            travel_min,
            gap_min,
            same_school: i.school_name == j.school_name,
            route_type_match: matches!((i.kind, j.kind), (RouteKind::Entry, RouteKind::Entry) | (RouteKind::Exit, RouteKind::Exit)),
            duration_ratio,
        }
    }
}

/// Fixed coefficients for the tie-break scorer. Hand-set, not fit: lower
/// travel and gap push the score up, matching school/type nudge it up
/// further, and an extreme duration ratio nudges it down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MlArcRanker {
    pub travel_weight: Float,
    pub gap_weight: Float,
    pub same_school_bonus: Float,
    pub route_type_bonus: Float,
    pub duration_ratio_penalty: Float,
    pub bias: Float,
}

impl Default for MlArcRanker {
    fn default() -> Self {
        Self {
            travel_weight: -0.05,
            gap_weight: -0.01,
            same_school_bonus: 0.4,
            route_type_bonus: 0.2,
            duration_ratio_penalty: -0.15,
            bias: 0.0,
        }
    }
}

impl MlArcRanker {
    /// Scores an arc in `(0, 1)` via the logistic function; higher is more
    /// preferable. Used purely as a tie-break nudge, never as a feasibility
    /// gate.
    pub fn score(&self, features: ArcFeatures) -> Float {
        let ratio_penalty_term = (features.duration_ratio - 1.0).abs();
        let z = self.bias
            + self.travel_weight * features.travel_min
            + self.gap_weight * features.gap_min
            + self.same_school_bonus * features.same_school as u8 as Float
            + self.route_type_bonus * features.route_type_match as u8 as Float
            + self.duration_ratio_penalty * ratio_penalty_term;
        1.0 / (1.0 + (-z).exp())
    }

    /// The maximum magnitude this nudge can contribute to an arc's weight,
    /// used by callers to keep it far below the smallest meaningful
    /// travel-weight difference so it only breaks exact ties.
    pub const MAX_NUDGE: Float = 1e-4;

    pub fn nudge(&self, features: ArcFeatures) -> Float {
        self.score(features) * Self::MAX_NUDGE
    }
}

#[cfg(test)]
#[path = "../tests/unit/ml_ranker_test.rs"]
mod ml_ranker_test;
