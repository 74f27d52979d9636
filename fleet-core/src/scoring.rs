//! Multi-objective scoring and candidate ranking, shared by local search, the LNS refiner, and the pipeline's
//! final candidate selection.

use crate::config::ObjectiveWeights;
use crate::model::Chain;
use fleet_heuristics::Float;

/// Per-chain statistics needed to compute the weighted score, so callers
/// that already tracked deadhead/overtime during construction don't pay
/// to recompute it from scratch every evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChainStats {
    pub deadhead_km: Float,
    pub overtime_hours: Float,
    pub shift_min: Float,
    pub jobs: u32,
    pub total_km: Float,
}

/// Computes the weighted multi-objective score for a full candidate (all
/// chains across all blocks for one day). Lower is better.
pub fn weighted_score(chains: &[Chain], stats: &[ChainStats], weights: &ObjectiveWeights) -> Float {
    let buses = chains.len() as Float;
    let deadhead_km: Float = stats.iter().map(|s| s.deadhead_km).sum();
    let overtime_hours: Float = stats.iter().map(|s| s.overtime_hours).sum();
    let shift_min: Float = stats.iter().map(|s| s.shift_min).sum();
    let total_km: Float = stats.iter().map(|s| s.total_km).sum();
    let balance = jobs_per_bus_variance(stats);

    weights.buses * buses
        + weights.deadhead_km * deadhead_km
        + weights.overtime_hours * overtime_hours
        + weights.shift_minutes * shift_min
        + weights.load_balance_variance * balance
        + weights.fuel_km * total_km
        + weights.co2_km * total_km
}

fn jobs_per_bus_variance(stats: &[ChainStats]) -> Float {
    if stats.is_empty() {
        return 0.0;
    }
    let counts: Vec<Float> = stats.iter().map(|s| s.jobs as Float).collect();
    let mean = counts.iter().sum::<Float>() / counts.len() as Float;
    counts.iter().map(|c| (c - mean).powi(2)).sum::<Float>() / counts.len() as Float
}

/// The lexicographic rank key used to compare candidates. Smaller is better
/// in every component; `Ord`/`PartialOrd` compare component-by-component in
/// declared order.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[allow(clippy::derive_partial_eq_without_eq)]
pub struct RankKey {
    pub viability_penalty: u8, // 1 if split_count > 0 else 0
    pub infeasible_buses: u32,
    pub best_buses: u32,
    pub load_spread_routes: u32,
    pub load_abs_dev_sum: u32,
    pub error_issues: u32,
    pub avg_deadhead: Float,
    pub warning_issues: u32,
    pub negative_avg_efficiency: Float, // -avg_efficiency
}

impl RankKey {
    pub fn is_viable(&self) -> bool {
        self.viability_penalty == 0
    }
}

#[cfg(test)]
#[path = "../tests/unit/scoring_test.rs"]
mod scoring_test;
