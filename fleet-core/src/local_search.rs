//! Local search: relocate and swap moves that only ever
//! apply when they strictly improve the weighted score, with feasibility
//! re-checked against the travel-time oracle for every candidate move.

use crate::config::{ChainConfig, ObjectiveWeights};
use crate::model::{Chain, Job, TimeShift};
use crate::scoring::{weighted_score, ChainStats};
use fleet_heuristics::Float;

/// Resolves travel minutes between two jobs synchronously. Callers supply
/// this backed by a pre-fetched matrix (the oracle itself is async; the
/// solver must not hold an async context across these calls).
pub trait TravelLookup {
    fn minutes(&self, from: &Job, to: &Job) -> Float;
}

/// Checks whether inserting `job` between `before` and `after` (either may
/// be absent at a chain boundary) respects the minimum buffer.
fn insertion_feasible(
    before: Option<&(Job, TimeShift)>,
    job: &Job,
    after: Option<&(Job, TimeShift)>,
    travel: &dyn TravelLookup,
    cfg: &ChainConfig,
) -> bool {
    if let Some((prev, shift)) = before {
        let prev_end = prev.anchor_time_min + shift.shift_min + prev.duration_min;
        let gap = job.anchor_time_min - prev_end - travel.minutes(prev, job);
        if gap < cfg.min_buffer_min {
            return false;
        }
    }
    if let Some((next, _)) = after {
        let job_end = job.anchor_time_min + job.duration_min;
        let gap = next.anchor_time_min - job_end - travel.minutes(job, next);
        if gap < cfg.min_buffer_min {
            return false;
        }
    }
    true
}

fn chain_pairs(chain: &Chain) -> Vec<(Job, TimeShift)> {
    chain.jobs.iter().cloned().zip(chain.shifts.iter().cloned()).collect()
}

pub(crate) fn stats_for(chain: &Chain, travel: &dyn TravelLookup) -> ChainStats {
    let mut deadhead_km = 0.0;
    let mut shift_min = 0.0;
    for pair in chain.shifts.iter() {
        shift_min += pair.shift_min.abs();
    }
    for window in chain.jobs.windows(2) {
        deadhead_km += travel.minutes(&window[0], &window[1]) / 60.0 * 45.0;
    }
    ChainStats { deadhead_km, overtime_hours: 0.0, shift_min, jobs: chain.jobs.len() as u32, total_km: deadhead_km }
}

pub(crate) fn total_score(chains: &[Chain], travel: &dyn TravelLookup, weights: &ObjectiveWeights) -> Float {
    let stats: Vec<ChainStats> = chains.iter().map(|c| stats_for(c, travel)).collect();
    weighted_score(chains, &stats, weights)
}

/// Attempts every relocate move (job from chain A into chain B at its
/// best feasible position) and applies the first one found that strictly
/// improves the score, re-scanning from scratch afterward. Repeats until
/// no improving move exists or `max_rounds` is reached.
pub fn relocate_and_swap(
    mut chains: Vec<Chain>,
    travel: &dyn TravelLookup,
    cfg: &ChainConfig,
    weights: &ObjectiveWeights,
    max_rounds: usize,
) -> Vec<Chain> {
    for _ in 0..max_rounds {
        let current_score = total_score(&chains, travel, weights);
        if let Some(improved) = try_one_relocate(&chains, travel, cfg, weights, current_score) {
            chains = improved;
            continue;
        }
        if let Some(improved) = try_one_swap(&chains, travel, cfg, weights, current_score) {
            chains = improved;
            continue;
        }
        break;
    }
    chains.retain(|c| !c.is_empty());
    chains
}

fn try_one_relocate(
    chains: &[Chain],
    travel: &dyn TravelLookup,
    cfg: &ChainConfig,
    weights: &ObjectiveWeights,
    current_score: Float,
) -> Option<Vec<Chain>> {
    for from_idx in 0..chains.len() {
        for job_idx in 0..chains[from_idx].jobs.len() {
            for to_idx in 0..chains.len() {
                if to_idx == from_idx {
                    continue;
                }
                let mut candidate = chains.to_vec();
                let job = candidate[from_idx].jobs.remove(job_idx);
                candidate[from_idx].shifts.remove(job_idx);

                let best_pos = best_feasible_insertion(&candidate[to_idx], &job, travel, cfg);
                let Some(pos) = best_pos else { continue };
                candidate[to_idx].jobs.insert(pos, job);
                candidate[to_idx].shifts.insert(pos, TimeShift { shift_min: 0.0 });

                let new_score = total_score(&candidate, travel, weights);
                if new_score < current_score - 1e-9 {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

fn try_one_swap(
    chains: &[Chain],
    travel: &dyn TravelLookup,
    cfg: &ChainConfig,
    weights: &ObjectiveWeights,
    current_score: Float,
) -> Option<Vec<Chain>> {
    for a_idx in 0..chains.len() {
        for b_idx in (a_idx + 1)..chains.len() {
            for ja in 0..chains[a_idx].jobs.len() {
                for jb in 0..chains[b_idx].jobs.len() {
                    let mut candidate = chains.to_vec();
                    let job_a = candidate[a_idx].jobs[ja].clone();
                    let job_b = candidate[b_idx].jobs[jb].clone();
                    candidate[a_idx].jobs[ja] = job_b.clone();
                    candidate[b_idx].jobs[jb] = job_a.clone();

                    if !chain_internally_feasible(&candidate[a_idx], travel, cfg)
                        || !chain_internally_feasible(&candidate[b_idx], travel, cfg)
                    {
                        continue;
                    }

                    let new_score = total_score(&candidate, travel, weights);
                    if new_score < current_score - 1e-9 {
                        return Some(candidate);
                    }
                }
            }
        }
    }
    None
}

fn chain_internally_feasible(chain: &Chain, travel: &dyn TravelLookup, cfg: &ChainConfig) -> bool {
    let pairs = chain_pairs(chain);
    pairs.windows(2).all(|w| {
        let (prev, prev_shift) = &w[0];
        let (next, _) = &w[1];
        let prev_end = prev.anchor_time_min + prev_shift.shift_min + prev.duration_min;
        let gap = next.anchor_time_min - prev_end - travel.minutes(prev, next);
        gap >= cfg.min_buffer_min
    })
}

/// Relocates jobs from the most-loaded chain to the least-loaded chain,
/// one at a time, as long as the move stays feasible and the spread
/// (`max jobs/bus - min jobs/bus`) strictly decreases. Aims for the
/// tighter `target_band` first, but is satisfied once the spread is
/// within `hard_spread_limit` and no further feasible move narrows it —
/// the hard limit is what the pipeline guarantees, the band is what it
/// tries for. This is `balance_load` (spec.md §6); the softer
/// `load_balance_variance` term in [`crate::scoring::weighted_score`]
/// already nudges LNS/local-search acceptance toward balance on every
/// move, so this pass only needs to act when that nudge wasn't enough.
pub fn balance_chain_loads(
    mut chains: Vec<Chain>,
    travel: &dyn TravelLookup,
    cfg: &ChainConfig,
    hard_spread_limit: u32,
    target_band: u32,
    max_rounds: usize,
) -> Vec<Chain> {
    let goal = target_band.min(hard_spread_limit);
    for _ in 0..max_rounds {
        if chains.len() < 2 {
            break;
        }
        let loads: Vec<usize> = chains.iter().map(Chain::len).collect();
        let (max_idx, &max_load) = loads.iter().enumerate().max_by_key(|(_, &l)| l).unwrap();
        let (min_idx, &min_load) = loads.iter().enumerate().min_by_key(|(_, &l)| l).unwrap();
        let spread = max_load.saturating_sub(min_load) as u32;
        if spread <= goal || max_idx == min_idx {
            break;
        }

        let moved = chains[max_idx].jobs.iter().enumerate().find_map(|(job_idx, job)| {
            best_feasible_insertion(&chains[min_idx], job, travel, cfg).map(|pos| (job_idx, pos))
        });
        match moved {
            Some((job_idx, pos)) => {
                let job = chains[max_idx].jobs.remove(job_idx);
                chains[max_idx].shifts.remove(job_idx);
                chains[min_idx].jobs.insert(pos, job);
                chains[min_idx].shifts.insert(pos, TimeShift { shift_min: 0.0 });
            }
            None => break, // no feasible move narrows this spread any further.
        }
    }
    chains.retain(|c| !c.is_empty());
    chains
}

pub(crate) fn best_feasible_insertion(chain: &Chain, job: &Job, travel: &dyn TravelLookup, cfg: &ChainConfig) -> Option<usize> {
    let pairs = chain_pairs(chain);
    let mut best: Option<(usize, Float)> = None;

    for pos in 0..=pairs.len() {
        let before = pos.checked_sub(1).and_then(|i| pairs.get(i));
        let after = pairs.get(pos);
        if insertion_feasible(before, job, after, travel, cfg) {
            let cost = before.map(|(p, _)| travel.minutes(p, job)).unwrap_or(0.0)
                + after.map(|(n, _)| travel.minutes(job, n)).unwrap_or(0.0);
            if best.map(|(_, c)| cost < c).unwrap_or(true) {
                best = Some((pos, cost));
            }
        }
    }
    best.map(|(pos, _)| pos)
}

#[cfg(test)]
#[path = "../tests/unit/local_search_test.rs"]
mod local_search_test;
