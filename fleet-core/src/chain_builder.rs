//! Chain builder: solves minimum path cover over a
//! per-block feasibility DAG and greedily applies time shifts to produce
//! feasibility-respecting chains.
//!
//! The DAG is acyclic by construction (arcs only run from an earlier
//! anchor time to a later one), so minimum path cover reduces
//! to maximum bipartite matching between "node as predecessor" copies and
//! "node as successor" copies: a matched edge `i -> j` means job `j`
//! directly follows job `i` in some chain. `n_jobs - |matching|` chains is
//! then the true lower bound on bus count for this block.

use crate::config::ChainConfig;
use crate::error::SolverError;
use crate::matching::{max_weight_matching, BipartiteEdge};
use crate::ml_ranker::{ArcFeatures, MlArcRanker};
use crate::model::{Chain, Job, RouteKind, SolverStatus, TimeShift};
use fleet_heuristics::timing::Budget;
use fleet_heuristics::Float;
use std::collections::HashSet;

/// Diagnostics reported alongside the built chains.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainBuilderDiagnostics {
    pub solver_status: SolverStatus,
    pub lower_bound_buses: u32,
    pub optimality_gap: Float,
    pub split_count: u32,
}

/// Whether job `i` may directly precede job `j` on the same bus, and if
/// so, at what arc weight. Exits may only be shifted later; entries only
/// earlier; both are bounded by `max_time_shift_min` and
/// the configured `min_start_hour` floor.
fn feasible_arc(i: &Job, j: &Job, travel_min: Float, cfg: &ChainConfig, min_start_hour: u32) -> Option<BipartiteEdge> {
    if i.unchainable || j.unchainable {
        return None;
    }
    let earliest_i_end = i.anchor_time_min + i.duration_min;
    let slack = j.anchor_time_min - earliest_i_end - travel_min - cfg.min_buffer_min;
    if slack >= 0.0 {
        return Some(edge_weight(travel_min, cfg));
    }

    // Not feasible at pinned anchors; see whether shifting `j` within
    // tolerance recovers feasibility. Entries may only move earlier
    // (never before `min_start_hour`); exits may only move later.
    let deficit = -slack;
    if deficit > cfg.max_time_shift_min {
        return None;
    }
    if matches!(j.kind, RouteKind::Entry) {
        let floor = (min_start_hour as Float) * 60.0;
        if j.anchor_time_min - deficit < floor {
            return None;
        }
    }
    Some(edge_weight(travel_min, cfg))
}

fn edge_weight(travel_min: Float, cfg: &ChainConfig) -> BipartiteEdge {
    BipartiteEdge { left: 0, right: 0, weight: cfg.large_weight - travel_min }
}

/// Builds every feasibility arc for one block's jobs, given a pre-resolved
/// travel-time matrix (`matrix[i][j]` = minutes from `jobs[i].end_loc` to
/// `jobs[j].start_loc`).
///
/// When `ml_ranker` is `Some`, each arc's weight is nudged by the ranker's
/// score before the matching solves — a tie-break hint only, bounded by
/// [`MlArcRanker::MAX_NUDGE`] so it can never outweigh a genuine travel-time
/// difference or make an infeasible arc feasible.
pub fn build_feasibility_arcs(
    jobs: &[Job],
    travel_matrix: &[Vec<Float>],
    cfg: &ChainConfig,
    min_start_hour: u32,
    ml_ranker: Option<&MlArcRanker>,
) -> Vec<BipartiteEdge> {
    let mut edges = Vec::new();
    for (i, job_i) in jobs.iter().enumerate() {
        for (j, job_j) in jobs.iter().enumerate() {
            if i == j {
                continue;
            }
            if job_j.anchor_time_min < job_i.anchor_time_min {
                continue;
            }
            let travel = travel_matrix[i][j];
            if let Some(mut edge) = feasible_arc(job_i, job_j, travel, cfg, min_start_hour) {
                edge.left = i;
                edge.right = j;
                if let Some(ranker) = ml_ranker {
                    edge.weight += ranker.nudge(ArcFeatures::compute(job_i, job_j, travel));
                }
                edges.push(edge);
            }
        }
    }
    edges
}

/// Solves the matching and reconstructs raw (pre-time-shift) chains as
/// sequences of job indices.
fn reconstruct_index_chains(n_jobs: usize, edges: &[BipartiteEdge]) -> (Vec<Vec<usize>>, u32) {
    let matching = max_weight_matching(n_jobs, n_jobs, edges);
    let lower_bound = (n_jobs as u32).saturating_sub(matching.pairs.len() as u32);

    let mut successor = vec![None; n_jobs];
    let mut has_predecessor = vec![false; n_jobs];
    for &(i, j) in &matching.pairs {
        successor[i] = Some(j);
        has_predecessor[j] = true;
    }

    let mut chains = Vec::new();
    for head in 0..n_jobs {
        if has_predecessor[head] {
            continue;
        }
        let mut chain = vec![head];
        let mut visited = HashSet::new();
        visited.insert(head);
        let mut cursor = head;
        while let Some(next) = successor[cursor] {
            if !visited.insert(next) {
                break; // visited-set safeguard: never cycle.
            }
            chain.push(next);
            cursor = next;
        }
        chains.push(chain);
    }
    (chains, lower_bound)
}

/// Greedily applies time shifts along a raw index chain, splitting it
/// into one-or-more chains whenever the accumulated shift would exceed
/// `max_time_shift_min`. Returns the finished chains plus how many splits
/// occurred.
fn apply_time_shifts(jobs: &[Job], raw_chain: &[usize], cfg: &ChainConfig) -> (Vec<Chain>, u32) {
    let mut result = Vec::new();
    let mut splits = 0u32;

    let mut current_jobs: Vec<Job> = Vec::new();
    let mut current_shifts: Vec<TimeShift> = Vec::new();

    for &idx in raw_chain {
        let job = jobs[idx].clone();
        if current_jobs.is_empty() {
            current_jobs.push(job);
            current_shifts.push(TimeShift { shift_min: 0.0 });
            continue;
        }

        let prev = current_jobs.last().unwrap();
        let prev_shift = current_shifts.last().unwrap().shift_min;
        let prev_end = prev.anchor_time_min + prev_shift + prev.duration_min;
        let required_start = prev_end + cfg.min_buffer_min;
        let needed_shift = (required_start - job.anchor_time_min).max(0.0);

        if needed_shift > cfg.max_time_shift_min {
            result.push(Chain { jobs: std::mem::take(&mut current_jobs), shifts: std::mem::take(&mut current_shifts) });
            splits += 1;
            current_jobs.push(job);
            current_shifts.push(TimeShift { shift_min: 0.0 });
        } else {
            current_jobs.push(job);
            current_shifts.push(TimeShift { shift_min: needed_shift });
        }
    }

    if !current_jobs.is_empty() {
        result.push(Chain { jobs: current_jobs, shifts: current_shifts });
    }
    (result, splits)
}

/// Builds every chain for one block, applying time shifts and splitting
/// as needed. `travel_matrix[i][j]` is minutes from job `i`'s end to job
/// `j`'s start.
///
/// Checks `budget` before doing any matching work and returns
/// `Err(SolverError::Timeout)` if it is already exhausted, so a caller can
/// retry in conservative mode or fall through to [`one_route_per_bus`]
/// without this solve ever starting partial, non-deterministic work.
/// `Err(SolverError::Infeasible)` is never produced: minimum path cover
/// over this block's feasibility DAG always admits the trivial cover of
/// one singleton chain per job, so there is no input this matching-based
/// solver rejects as infeasible.
pub fn build_chains_for_block(
    jobs: &[Job],
    travel_matrix: &[Vec<Float>],
    cfg: &ChainConfig,
    min_start_hour: u32,
    ml_ranker: Option<&MlArcRanker>,
    budget: &Budget,
) -> Result<(Vec<Chain>, ChainBuilderDiagnostics), SolverError> {
    if jobs.is_empty() {
        return Ok((
            Vec::new(),
            ChainBuilderDiagnostics {
                solver_status: SolverStatus::Optimal,
                lower_bound_buses: 0,
                optimality_gap: 0.0,
                split_count: 0,
            },
        ));
    }
    if budget.is_exhausted() {
        return Err(SolverError::Timeout);
    }

    let edges = build_feasibility_arcs(jobs, travel_matrix, cfg, min_start_hour, ml_ranker);
    let (raw_chains, lower_bound) = reconstruct_index_chains(jobs.len(), &edges);

    let mut chains = Vec::new();
    let mut total_splits = 0u32;
    for raw in &raw_chains {
        let (mut split_chains, splits) = apply_time_shifts(jobs, raw, cfg);
        total_splits += splits;
        chains.append(&mut split_chains);
    }

    let best = chains.len() as u32;
    let optimality_gap = if lower_bound == 0 {
        0.0
    } else {
        ((best as Float) - (lower_bound as Float)).max(0.0) / (lower_bound as Float)
    };

    let diagnostics = ChainBuilderDiagnostics {
        solver_status: if total_splits > 0 { SolverStatus::OptimalWithSplits } else { SolverStatus::Optimal },
        lower_bound_buses: lower_bound.max(1),
        optimality_gap,
        split_count: total_splits,
    };
    Ok((chains, diagnostics))
}

/// Safety-net chain set: one singleton chain per job, used when both the
/// primary solve and its conservative retry time out.
pub fn one_route_per_bus(jobs: &[Job]) -> Vec<Chain> {
    jobs.iter().cloned().map(Chain::single).collect()
}

#[cfg(test)]
#[path = "../tests/unit/chain_builder_test.rs"]
mod chain_builder_test;
