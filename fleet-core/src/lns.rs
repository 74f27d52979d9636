//! LNS refiner: a destroy-and-repair metaheuristic with
//! simulated-annealing (Metropolis) acceptance, single-threaded and
//! cooperative with no shared mutable state beyond the current candidate.

use crate::config::{ChainConfig, LnsConfig, ObjectiveWeights};
use crate::local_search::{best_feasible_insertion, total_score, TravelLookup};
use crate::model::{Chain, Job, TimeShift};
use fleet_heuristics::timing::Budget;
use fleet_heuristics::random::DefaultRandom;
use fleet_heuristics::Float;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestroyStrategy {
    Random,
    Worst,
    Related,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepairStrategy {
    Greedy,
    Regret2,
}

/// Shaw-relatedness distance between two jobs: smaller means "more
/// related", so destroy-by-relation removes jobs close to a random seed
/// under this metric.
fn relatedness(a: &Job, b: &Job, travel: &dyn TravelLookup) -> Float {
    let time_component = 0.5 * (a.anchor_time_min - b.anchor_time_min).abs();
    let deadhead_km = travel.minutes(a, b) / 60.0 * 45.0;
    let geo_component = 10.0 * deadhead_km;
    let mut value = time_component + geo_component;
    if a.kind == b.kind {
        value -= 30.0;
    }
    if a.school_name == b.school_name {
        value -= 50.0;
    }
    value.max(0.0)
}

/// A flat, mutable working set: every job currently assigned to some
/// chain, plus a pool of removed (currently unassigned) jobs.
struct WorkingSet {
    chains: Vec<Chain>,
}

impl WorkingSet {
    fn all_jobs(&self) -> Vec<(usize, usize, Job)> {
        let mut out = Vec::new();
        for (c_idx, chain) in self.chains.iter().enumerate() {
            for (j_idx, job) in chain.jobs.iter().enumerate() {
                out.push((c_idx, j_idx, job.clone()));
            }
        }
        out
    }

    fn remove_jobs(&mut self, removed_ids: &std::collections::HashSet<String>) -> Vec<Job> {
        let mut removed = Vec::new();
        for chain in self.chains.iter_mut() {
            let mut keep_jobs = Vec::new();
            let mut keep_shifts = Vec::new();
            for (job, shift) in chain.jobs.drain(..).zip(chain.shifts.drain(..)) {
                if removed_ids.contains(&job.route_id) {
                    removed.push(job);
                } else {
                    keep_jobs.push(job);
                    keep_shifts.push(shift);
                }
            }
            chain.jobs = keep_jobs;
            chain.shifts = keep_shifts;
        }
        self.chains.retain(|c| !c.is_empty());
        removed
    }
}

fn select_destroy_set(
    working: &WorkingSet,
    count: usize,
    strategy: DestroyStrategy,
    travel: &dyn TravelLookup,
    rng: &mut DefaultRandom,
) -> std::collections::HashSet<String> {
    let all = working.all_jobs();
    if all.is_empty() || count == 0 {
        return std::collections::HashSet::new();
    }
    let count = count.min(all.len());

    let chosen: Vec<usize> = match strategy {
        DestroyStrategy::Random => rng.sample_indexes(all.len(), count),
        DestroyStrategy::Worst => {
            let mut scored: Vec<(usize, Float)> = all
                .iter()
                .enumerate()
                .map(|(idx, (c_idx, j_idx, job))| {
                    let chain = &working.chains[*c_idx];
                    let deadhead = if *j_idx + 1 < chain.jobs.len() {
                        travel.minutes(job, &chain.jobs[*j_idx + 1])
                    } else {
                        0.0
                    };
                    let underload_bonus = if chain.jobs.len() <= 1 { 1.5 } else { 1.0 };
                    (idx, deadhead * underload_bonus)
                })
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.into_iter().take(count).map(|(idx, _)| idx).collect()
        }
        DestroyStrategy::Related => {
            let seed_idx = rng.sample_indexes(all.len(), 1)[0];
            let seed_job = &all[seed_idx].2;
            let mut scored: Vec<(usize, Float)> = all
                .iter()
                .enumerate()
                .map(|(idx, (_, _, job))| (idx, relatedness(seed_job, job, travel)))
                .collect();
            scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.into_iter().take(count).map(|(idx, _)| idx).collect()
        }
    };

    chosen.into_iter().map(|idx| all[idx].2.route_id.clone()).collect()
}

fn repair(
    working: &mut WorkingSet,
    mut removed: Vec<Job>,
    strategy: RepairStrategy,
    travel: &dyn TravelLookup,
    cfg: &ChainConfig,
) {
    match strategy {
        RepairStrategy::Greedy => {
            while let Some(job) = removed.pop() {
                insert_best_or_new_chain(working, job, travel, cfg);
            }
        }
        RepairStrategy::Regret2 => {
            while !removed.is_empty() {
                let mut best_idx = 0;
                let mut best_regret = Float::NEG_INFINITY;

                for (idx, job) in removed.iter().enumerate() {
                    let mut costs: Vec<Float> = working
                        .chains
                        .iter()
                        .filter_map(|chain| best_feasible_insertion(chain, job, travel, cfg).map(|pos| insertion_cost(chain, job, pos, travel)))
                        .collect();
                    costs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                    let regret = match costs.len() {
                        0 => Float::INFINITY, // must open a new chain; highest priority
                        1 => costs[0],
                        _ => costs[1] - costs[0],
                    };
                    if regret > best_regret {
                        best_regret = regret;
                        best_idx = idx;
                    }
                }
                let job = removed.remove(best_idx);
                insert_best_or_new_chain(working, job, travel, cfg);
            }
        }
    }
}

fn insertion_cost(chain: &Chain, job: &Job, pos: usize, travel: &dyn TravelLookup) -> Float {
    let before = pos.checked_sub(1).and_then(|i| chain.jobs.get(i));
    let after = chain.jobs.get(pos);
    before.map(|p| travel.minutes(p, job)).unwrap_or(0.0) + after.map(|n| travel.minutes(job, n)).unwrap_or(0.0)
}

fn insert_best_or_new_chain(working: &mut WorkingSet, job: Job, travel: &dyn TravelLookup, cfg: &ChainConfig) {
    let mut best: Option<(usize, usize, Float)> = None;
    for (c_idx, chain) in working.chains.iter().enumerate() {
        if let Some(pos) = best_feasible_insertion(chain, &job, travel, cfg) {
            let cost = insertion_cost(chain, &job, pos, travel);
            if best.map(|(_, _, c)| cost < c).unwrap_or(true) {
                best = Some((c_idx, pos, cost));
            }
        }
    }
    match best {
        Some((c_idx, pos, _)) => {
            working.chains[c_idx].jobs.insert(pos, job);
            working.chains[c_idx].shifts.insert(pos, TimeShift { shift_min: 0.0 });
        }
        None => working.chains.push(Chain::single(job)),
    }
}

/// Runs the LNS refiner to completion (iteration cap, no-improvement
/// streak, or wall-clock budget, whichever comes first), returning the
/// best candidate found.
pub fn run_lns(
    initial: Vec<Chain>,
    travel: &dyn TravelLookup,
    cfg: &LnsConfig,
    chain_cfg: &ChainConfig,
    weights: &ObjectiveWeights,
    rng: &mut DefaultRandom,
    budget: &Budget,
) -> Vec<Chain> {
    let mut working = WorkingSet { chains: initial };
    let mut best = working.chains.clone();
    let mut best_score = total_score(&best, travel, weights);
    let mut current_score = best_score;

    let mut temperature = cfg.initial_temperature;
    let mut destroy_rate = cfg.destroy_rate;
    let mut no_improvement = 0usize;
    let mut recent_improvements = 0usize;
    let mut recent_rounds = 0usize;

    for _ in 0..cfg.max_iterations {
        if budget.is_exhausted() || no_improvement >= cfg.max_no_improvement {
            break;
        }

        let total_jobs: usize = working.chains.iter().map(Chain::len).sum();
        let remove_count = ((destroy_rate * total_jobs as Float).ceil() as usize).max(1);
        let strategy = pick_destroy_strategy(rng);
        let removed_ids = select_destroy_set(&working, remove_count, strategy, travel, rng);

        let mut candidate = WorkingSet { chains: working.chains.clone() };
        let removed_jobs = candidate.remove_jobs(&removed_ids);
        let repair_strategy = if rng.is_hit(0.5) { RepairStrategy::Greedy } else { RepairStrategy::Regret2 };
        repair(&mut candidate, removed_jobs, repair_strategy, travel, chain_cfg);

        let candidate_score = total_score(&candidate.chains, travel, weights);
        let delta = candidate_score - current_score;
        let accept = delta < 0.0 || rng.uniform_real() < (-delta / temperature.max(1e-6)).exp();

        recent_rounds += 1;
        if accept {
            working = candidate;
            current_score = candidate_score;
            if candidate_score < best_score - 1e-9 {
                best_score = candidate_score;
                best = working.chains.clone();
                no_improvement = 0;
                recent_improvements += 1;
            } else {
                no_improvement += 1;
            }
        } else {
            no_improvement += 1;
        }

        temperature *= cfg.cooling_rate;

        if cfg.adaptive_destroy && recent_rounds >= 10 {
            let ratio = recent_improvements as Float / recent_rounds as Float;
            if ratio < 0.2 {
                destroy_rate = (destroy_rate + 0.02).min(cfg.max_destroy_rate);
            } else if ratio > 0.4 {
                destroy_rate = (destroy_rate - 0.02).max(cfg.min_destroy_rate);
            }
            recent_rounds = 0;
            recent_improvements = 0;
        }
    }

    best.retain(|c| !c.is_empty());
    best
}

fn pick_destroy_strategy(rng: &mut DefaultRandom) -> DestroyStrategy {
    match rng.uniform_int(0, 2) {
        0 => DestroyStrategy::Random,
        1 => DestroyStrategy::Worst,
        _ => DestroyStrategy::Related,
    }
}

#[cfg(test)]
#[path = "../tests/unit/lns_test.rs"]
mod lns_test;
