//! Pipeline orchestrator: runs baseline optimization,
//! refinement iterations, validation and fleet assignment once per
//! weekday, then aggregates into a single `PipelineResult`.

use crate::blocks::prepare_jobs_for_day;
use crate::chain_builder::{build_chains_for_block, one_route_per_bus, ChainBuilderDiagnostics};
use crate::config::{ChainConfig, FullConfig, Objective, QuboConfig};
use crate::error::PipelineError;
use crate::fleet_assign::assign_fleet;
use crate::geometry::fallback_travel_minutes;
use crate::local_search::{balance_chain_loads, best_feasible_insertion, relocate_and_swap, TravelLookup};
use crate::lns::run_lns;
use crate::ml_ranker::MlArcRanker;
use crate::model::{
    Block, BusSchedule, Chain, DayStats, HistoryEntry, Job, Metrics, PipelineResult, Route, ScheduleItem, SolverStatus,
    TimeShift, ValidationReport, VehicleProfile, Weekday,
};
use crate::oracle::TravelTimeOracle;
use crate::qubo::{Candidate, QuboProblem, RouteCandidates, Selection};
use crate::scoring::RankKey;
use crate::validator::{day_efficiency_stats, validate_day};
use fleet_heuristics::logging::InfoLogger;
use fleet_heuristics::random::DefaultRandom;
use fleet_heuristics::timing::Budget;
use fleet_heuristics::Float;
use hashbrown::HashMap;
use rayon::prelude::*;
use std::time::Duration;

/// A synchronous travel lookup backed by a pre-fetched `route_id -> route_id`
/// minutes table, with a straight-line fallback for pairs the prefetch
/// never saw (e.g. two jobs freshly adjacent after a cross-block merge).
/// The CPU-bound solvers (chain builder, local search, LNS) must not hold
/// an async context across their many candidate evaluations, so every
/// oracle call they might need is resolved up front instead.
struct PrefetchedTravel {
    by_route_pair: HashMap<(String, String), Float>,
    geometry: crate::config::GeometryConfig,
}

impl TravelLookup for PrefetchedTravel {
    fn minutes(&self, from: &Job, to: &Job) -> Float {
        self.by_route_pair
            .get(&(from.route_id.clone(), to.route_id.clone()))
            .copied()
            .unwrap_or_else(|| fallback_travel_minutes(&from.end_loc, &to.start_loc, &self.geometry))
    }
}

async fn prefetch_travel(jobs: &[Job], oracle: &TravelTimeOracle, geometry: &crate::config::GeometryConfig) -> PrefetchedTravel {
    let ends: Vec<_> = jobs.iter().map(|j| j.end_loc).collect();
    let starts: Vec<_> = jobs.iter().map(|j| j.start_loc).collect();
    let matrix = oracle.matrix(&ends, &starts).await;

    let mut by_route_pair = HashMap::with_capacity(jobs.len() * jobs.len());
    for (i, from) in jobs.iter().enumerate() {
        for (j, to) in jobs.iter().enumerate() {
            if i == j {
                continue;
            }
            if let Some(minutes) = matrix[i][j] {
                by_route_pair.insert((from.route_id.clone(), to.route_id.clone()), minutes);
            }
        }
    }
    PrefetchedTravel { by_route_pair, geometry: *geometry }
}

/// Synthesizes the minimal boundary stops (start and end location) a
/// `Job` still carries, since `Job` keeps only the reduced `start_loc`/
/// `end_loc` pair rather than the originating route's full stop list.
/// This is what lets `validator::validate_bus` recover real endpoints
/// from `ScheduleItem.stops` instead of silently defaulting to `(0, 0)`.
fn boundary_stops(job: &Job) -> Vec<crate::model::Stop> {
    let make = |loc: crate::geometry::LatLng, order: u32| crate::model::Stop {
        name: job.route_id.clone(),
        lat: loc.lat,
        lon: loc.lng,
        order,
        time_from_start_min: if order == 0 { 0.0 } else { job.duration_min },
        is_school: false,
        passengers: 0,
    };
    vec![make(job.start_loc, 0), make(job.end_loc, 1)]
}

fn chain_to_schedule_items(chain: &Chain, travel: &dyn TravelLookup) -> Vec<ScheduleItem> {
    let mut items = Vec::with_capacity(chain.jobs.len());
    for (idx, (job, shift)) in chain.jobs.iter().zip(chain.shifts.iter()).enumerate() {
        let start = job.anchor_time_min + shift.shift_min;
        let deadhead = if idx == 0 { 0.0 } else { travel.minutes(&chain.jobs[idx - 1], job) };
        items.push(ScheduleItem {
            route_id: job.route_id.clone(),
            start_time: start,
            end_time: start + job.duration_min,
            kind: job.kind,
            original_start_time: job.anchor_time_min,
            time_shift_min: shift.shift_min,
            deadhead_min: deadhead,
            capacity_needed: job.capacity_needed,
            stops: boundary_stops(job),
            school_name: job.school_name.clone(),
            contract_id: job.contract_id.clone(),
            vehicle_capacity_min: job.vehicle_capacity_min,
            vehicle_capacity_max: job.vehicle_capacity_max,
            peak_stop_passengers: job.peak_stop_passengers,
        });
    }
    items
}

fn chains_to_buses(chains: &[Chain], travel: &dyn TravelLookup, day_index: usize) -> Vec<BusSchedule> {
    chains
        .iter()
        .enumerate()
        .map(|(idx, chain)| BusSchedule {
            bus_id: format!("bus-{day_index}-{idx}"),
            items: chain_to_schedule_items(chain, travel),
            min_required_seats: 0,
            assigned_vehicle: None,
            uses_fleet_profile: false,
        })
        .collect()
}

/// A fully built candidate for one day: the chains it holds and the rank
/// key it was last scored at.
struct DayCandidate {
    chains: Vec<Chain>,
    rank: RankKey,
}

fn compute_rank(
    chains: &[Chain],
    split_count: u32,
    error_issues: u32,
    warning_issues: u32,
    infeasible_buses: u32,
    avg_deadhead: Float,
    avg_efficiency: Float,
) -> RankKey {
    let counts: Vec<u32> = chains.iter().map(|c| c.jobs.len() as u32).collect();
    let load_spread = counts.iter().max().copied().unwrap_or(0).saturating_sub(counts.iter().min().copied().unwrap_or(0));
    let mean = if counts.is_empty() { 0.0 } else { counts.iter().sum::<u32>() as Float / counts.len() as Float };
    let load_abs_dev_sum: u32 = counts.iter().map(|&c| (c as Float - mean).abs().round() as u32).sum();

    RankKey {
        viability_penalty: if split_count > 0 { 1 } else { 0 },
        infeasible_buses,
        best_buses: chains.len() as u32,
        load_spread_routes: load_spread,
        load_abs_dev_sum,
        error_issues,
        avg_deadhead,
        warning_issues,
        negative_avg_efficiency: -avg_efficiency,
    }
}

fn rank_less_than(a: &RankKey, b: &RankKey) -> bool {
    a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal) == std::cmp::Ordering::Less
}

/// The tightest-buffer job in each chain transition, ranked ascending by
/// buffer (the most conflict-prone jobs first) and capped at
/// `max_hot`. These are the candidates the QUBO hybrid refiner tries to
/// relocate.
struct HotJob {
    chain_idx: usize,
    job: Job,
}

/// Connection penalty for the transition landing on `job` (started at
/// `job_start`) immediately after `prev`, or `0.0` at a chain head.
fn leading_penalty(prev: Option<(&Job, Float)>, job: &Job, job_start: Float, travel: &dyn TravelLookup) -> Float {
    match prev {
        Some((prev_job, prev_start)) => {
            let prev_end = prev_start + prev_job.duration_min;
            let time_available = job_start - prev_end;
            let buffer = time_available - travel.minutes(prev_job, job);
            crate::qubo::connection_penalty(time_available, buffer)
        }
        None => 0.0,
    }
}

/// Connection penalty for the transition leaving `job` (ending at
/// `job_end`) into `next`, or `0.0` at a chain tail.
fn trailing_penalty(job: &Job, job_end: Float, next: Option<(&Job, Float)>, travel: &dyn TravelLookup) -> Float {
    match next {
        Some((next_job, next_start)) => {
            let time_available = next_start - job_end;
            let buffer = time_available - travel.minutes(job, next_job);
            crate::qubo::connection_penalty(time_available, buffer)
        }
        None => 0.0,
    }
}

/// Scores every adjacent transition in `chains` by its connection penalty
/// (the same measure the validator would flag as `insufficient_time` or
/// `tight_buffer`) and keeps the `max_hot` hottest later legs — a direct
/// stand-in for ranking by validator error involvement, since a
/// transition the validator marks as an error or warning is exactly one
/// whose connection penalty here is non-zero.
fn identify_hot_jobs(chains: &[Chain], travel: &dyn TravelLookup, max_hot: usize) -> Vec<HotJob> {
    let mut scored: Vec<(Float, HotJob)> = Vec::new();
    for (chain_idx, chain) in chains.iter().enumerate() {
        for w in 0..chain.jobs.len().saturating_sub(1) {
            let prev = &chain.jobs[w];
            let prev_start = prev.anchor_time_min + chain.shifts[w].shift_min;
            let next = &chain.jobs[w + 1];
            let next_start = next.anchor_time_min + chain.shifts[w + 1].shift_min;
            let penalty = trailing_penalty(prev, prev_start + prev.duration_min, Some((next, next_start)), travel);
            scored.push((penalty, HotJob { chain_idx, job: next.clone() }));
        }
    }
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(max_hot).map(|(_, hot)| hot).collect()
}

/// Buses (by temporal distance of their earliest item to the hot job's own
/// start) considered as relocation targets, capped at
/// `cfg.max_buses_per_route`; the hot job's own chain is always included so
/// "stay put" is never excluded by the cap.
fn candidate_chain_order(hot: &HotJob, chains: &[Chain], cfg: &QuboConfig) -> Vec<usize> {
    let hot_start = hot.job.anchor_time_min;
    let mut order: Vec<usize> = (0..chains.len()).collect();
    order.sort_by(|&a, &b| {
        let da = temporal_distance(&chains[a], hot_start);
        let db = temporal_distance(&chains[b], hot_start);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });
    order.truncate(cfg.max_buses_per_route);
    if !order.contains(&hot.chain_idx) {
        order.push(hot.chain_idx);
    }
    order
}

fn temporal_distance(chain: &Chain, reference_start: Float) -> Float {
    chain
        .jobs
        .iter()
        .zip(chain.shifts.iter())
        .map(|(j, s)| (j.anchor_time_min + s.shift_min - reference_start).abs())
        .fold(Float::INFINITY, Float::min)
}

/// Builds every placement candidate for one hot job: staying where it is,
/// plus the best feasible insertion position into each of the
/// temporally-closest `max_buses_per_route` other chains. Cost is the
/// connection penalty of the two transitions the insertion creates, plus a
/// bus-bloat penalty proportional to how full the target already is, plus
/// a flat penalty for moving to a different bus than the one it started
/// on. The synthetic "open a new bus" candidate is appended by
/// `QuboProblem::build`; candidates are trimmed to the
/// `cfg.max_candidates_per_route` cheapest by `QuboProblem::build` too.
fn build_route_candidates(
    hot: &HotJob,
    chains: &[Chain],
    travel: &dyn TravelLookup,
    chain_cfg: &crate::config::ChainConfig,
    qubo_cfg: &QuboConfig,
) -> RouteCandidates {
    let start_min = hot.job.anchor_time_min;
    let end_min = start_min + hot.job.duration_min;
    let mut candidates = Vec::new();

    for idx in candidate_chain_order(hot, chains, qubo_cfg) {
        let chain = &chains[idx];
        let pos = if idx == hot.chain_idx {
            chain.jobs.iter().position(|j| j.route_id == hot.job.route_id).unwrap_or(0)
        } else {
            match best_feasible_insertion(chain, &hot.job, travel, chain_cfg) {
                Some(pos) => pos,
                None => continue,
            }
        };

        let before = pos.checked_sub(1).and_then(|i| chain.jobs.get(i)).map(|j| {
            let j_idx = pos - 1;
            (j, j.anchor_time_min + chain.shifts[j_idx].shift_min)
        });
        let after_idx = if idx == hot.chain_idx { pos + 1 } else { pos };
        let after = chain.jobs.get(after_idx).map(|j| (j, j.anchor_time_min + chain.shifts[after_idx].shift_min));

        let cost = leading_penalty(before, &hot.job, start_min, travel)
            + trailing_penalty(&hot.job, end_min, after, travel)
            + chain.jobs.len() as Float * 1.5
            + if idx != hot.chain_idx { 8.0 } else { 0.0 };

        candidates.push(Candidate { target_bus: Some(idx), insertion_index: pos, cost, start_min, end_min });
    }
    RouteCandidates { route_id: hot.job.route_id.clone(), candidates }
}

/// Removes each hot job from its current chain and reinserts it per the
/// QUBO's selection: the same chain if it stayed, the best feasible
/// position in its target chain if relocated, or a brand-new singleton
/// chain for the synthetic "new bus" candidate.
fn apply_qubo_selection(
    mut chains: Vec<Chain>,
    hot_jobs: &[HotJob],
    problem: &QuboProblem,
    selection: &Selection,
    travel: &dyn TravelLookup,
    cfg: &crate::config::ChainConfig,
) -> Vec<Chain> {
    for (g_idx, hot) in hot_jobs.iter().enumerate() {
        let candidate = &problem.groups[g_idx].candidates[selection[g_idx]];
        let Some(origin_idx) = chains.iter().position(|c| c.jobs.iter().any(|j| j.route_id == hot.job.route_id)) else { continue };
        if candidate.target_bus == Some(origin_idx) {
            continue;
        }
        let Some(job_pos) = chains[origin_idx].jobs.iter().position(|j| j.route_id == hot.job.route_id) else { continue };
        let job = chains[origin_idx].jobs.remove(job_pos);
        chains[origin_idx].shifts.remove(job_pos);

        match candidate.target_bus {
            Some(target) if target < chains.len() && target != origin_idx => {
                if let Some(pos) = best_feasible_insertion(&chains[target], &job, travel, cfg) {
                    chains[target].jobs.insert(pos, job);
                    chains[target].shifts.insert(pos, TimeShift { shift_min: 0.0 });
                } else {
                    chains.push(Chain::single(job));
                }
            }
            _ => chains.push(Chain::single(job)),
        }
    }
    chains.retain(|c| !c.is_empty());
    chains
}

/// One QUBO hybrid refinement pass: identifies the hottest (tightest
/// buffer) jobs, encodes their possible relocations as a one-hot QUBO, and
/// applies the solved selection back onto the chains.
fn hybrid_refine(
    chains: Vec<Chain>,
    travel: &dyn TravelLookup,
    cfg: &crate::config::ChainConfig,
    qubo_cfg: &QuboConfig,
    rng: &mut fleet_heuristics::random::DefaultRandom,
) -> Vec<Chain> {
    let hot_jobs = identify_hot_jobs(&chains, travel, qubo_cfg.max_hot_routes);
    if hot_jobs.is_empty() {
        return chains;
    }
    let per_route: Vec<RouteCandidates> =
        hot_jobs.iter().map(|h| build_route_candidates(h, &chains, travel, cfg, qubo_cfg)).collect();
    let problem = QuboProblem::build(per_route, qubo_cfg);
    if problem.groups.is_empty() {
        return chains;
    }
    let hot_jobs = &hot_jobs[..problem.groups.len()];
    let selection = crate::qubo::solve(&problem, qubo_cfg, rng);
    apply_qubo_selection(chains, hot_jobs, &problem, &selection, travel, cfg)
}

/// Solves one block's chain cover under the solver's retry/safety-net
/// policy: try the full solve, retry once in conservative mode (ML
/// ranking disabled) if the budget is exhausted, and fall back to
/// [`one_route_per_bus`] — one bus per job, no chaining at all — if the
/// retry also times out. Since this matching-based solver only ever
/// raises `SolverError::Timeout` (never `Infeasible`), a genuinely
/// exhausted wall-clock budget makes the conservative retry collapse
/// straight into the same timeout; the retry still runs so a future,
/// slower solver swapped in behind this signature gets a real second
/// attempt.
fn solve_block_with_fallback(
    block_jobs: &[Job],
    matrix: &[Vec<Float>],
    cfg: &ChainConfig,
    min_start_hour: u32,
    ml_ranker: Option<&MlArcRanker>,
    budget: &Budget,
) -> (Vec<Chain>, ChainBuilderDiagnostics) {
    if let Ok(result) = build_chains_for_block(block_jobs, matrix, cfg, min_start_hour, ml_ranker, budget) {
        return result;
    }
    if let Ok(result) = build_chains_for_block(block_jobs, matrix, cfg, min_start_hour, None, budget) {
        return result;
    }
    let chains = one_route_per_bus(block_jobs);
    let diagnostics = ChainBuilderDiagnostics {
        solver_status: SolverStatus::FallbackRoutePerBus,
        lower_bound_buses: chains.len() as u32,
        optimality_gap: 0.0,
        split_count: 0,
    };
    (chains, diagnostics)
}

/// Runs the full pipeline for one weekday: ingest, baseline optimize,
/// validate, iterate, select, fleet-assign.
async fn run_day(
    day: Weekday,
    routes: &[Route],
    config: &FullConfig,
    oracle: &TravelTimeOracle,
    progress: &InfoLogger,
) -> Result<(Vec<BusSchedule>, ValidationReport, DayStats, u32, u32, u32, Vec<HistoryEntry>), PipelineError> {
    let day_routes: Vec<Route> = routes.iter().filter(|r| r.days.contains(&day)).cloned().collect();
    progress(&format!("{day:?}: ingest starting ({} candidate routes)", day_routes.len()));

    let (jobs, dropped) = prepare_jobs_for_day(&day_routes, &config.blocks, &config.chain);
    if jobs.is_empty() {
        return Ok((
            Vec::new(),
            ValidationReport::default(),
            DayStats::default(),
            dropped,
            0,
            0,
            Vec::new(),
        ));
    }

    let travel = prefetch_travel(&jobs, oracle, &config.geometry).await;

    let ml_ranker = config.pipeline.use_ml_assignment.then(MlArcRanker::default);
    let budget = Budget::new(Duration::from_secs(config.pipeline.max_duration_sec));

    // Each block's feasibility DAG and matching solve is independent of the
    // others (arcs never cross block boundaries), so the four per-block
    // solves run across the Rayon global pool rather than sequentially,
    // the same way the teacher parallelizes per-job feature evaluation.
    let per_block_results: Vec<(Block, Vec<Chain>, ChainBuilderDiagnostics)> = Block::ORDER
        .par_iter()
        .map(|&block| {
            let block_jobs: Vec<Job> = jobs.iter().filter(|j| j.block == block).cloned().collect();
            let indices: Vec<usize> = (0..block_jobs.len()).collect();
            let matrix: Vec<Vec<Float>> = indices
                .iter()
                .map(|&i| indices.iter().map(|&j| if i == j { 0.0 } else { travel.minutes(&block_jobs[i], &block_jobs[j]) }).collect())
                .collect();
            let (chains, diag) = solve_block_with_fallback(
                &block_jobs,
                &matrix,
                &config.chain,
                config.blocks.min_start_hour,
                ml_ranker.as_ref(),
                &budget,
            );
            (block, chains, diag)
        })
        .collect();

    let mut diagnostics_by_block: Vec<ChainBuilderDiagnostics> = Vec::new();
    let mut chains_by_block: HashMap<Block, Vec<Chain>> = HashMap::new();
    for (block, chains, diag) in per_block_results {
        diagnostics_by_block.push(diag);
        chains_by_block.insert(block, chains);
    }

    let lower_bound_buses: u32 = diagnostics_by_block.iter().map(|d| d.lower_bound_buses).sum();
    let mut split_count: u32 = diagnostics_by_block.iter().map(|d| d.split_count).sum();
    let block_solver_status = diagnostics_by_block
        .iter()
        .fold(SolverStatus::Optimal, |acc, d| acc.worst_of(d.solver_status));

    let morning = chains_by_block.remove(&Block::MorningEntry).unwrap_or_default();
    let exit1 = chains_by_block.remove(&Block::EarlyAfternoonExit).unwrap_or_default();
    let entry2 = chains_by_block.remove(&Block::LateAfternoonEntry).unwrap_or_default();
    let exit2 = chains_by_block.remove(&Block::LateAfternoonExit).unwrap_or_default();

    let merged_1 = crate::merger::merge_adjacent_blocks(morning, exit1, &config.chain, |tail, head| {
        let t = tail.jobs.last()?;
        let h = head.jobs.first()?;
        Some(travel.minutes(t, h))
    });
    let merged_2 = crate::merger::merge_adjacent_blocks(merged_1, entry2, &config.chain, |tail, head| {
        let t = tail.jobs.last()?;
        let h = head.jobs.first()?;
        Some(travel.minutes(t, h))
    });
    let mut chains = crate::merger::merge_adjacent_blocks(merged_2, exit2, &config.chain, |tail, head| {
        let t = tail.jobs.last()?;
        let h = head.jobs.first()?;
        Some(travel.minutes(t, h))
    });

    progress(&format!("{day:?}: baseline built {} chains (lower bound {lower_bound_buses})", chains.len()));

    chains = relocate_and_swap(chains, &travel, &config.chain, &config.pipeline.objective.weights(), 50);
    if config.pipeline.balance_load {
        chains = balance_chain_loads(
            chains,
            &travel,
            &config.chain,
            config.pipeline.load_balance_hard_spread_limit,
            config.pipeline.load_balance_target_band,
            50,
        );
    }

    let weights = config.pipeline.objective.weights();

    let baseline_buses = chains_to_buses(&chains, &travel, day as u8 as usize);
    let (_baseline_incidents, baseline_summary) = validate_day(&baseline_buses, day, oracle, &config.chain).await;
    let (baseline_deadhead, baseline_efficiency) = day_efficiency_stats(&baseline_buses);
    let mut best_candidate = DayCandidate {
        rank: compute_rank(
            &chains,
            split_count,
            baseline_summary.incidents_error,
            baseline_summary.incidents_warning,
            baseline_summary.total_buses - baseline_summary.feasible_buses,
            baseline_deadhead,
            baseline_efficiency,
        ),
        chains,
    };

    let mut rng = DefaultRandom::new_with_seed(config.pipeline.seed);
    let mut day_history = Vec::new();

    for iteration in 1..=config.pipeline.max_iterations {
        if budget.is_exhausted() {
            let message = format!("{day:?}: wall-clock budget exhausted before iteration {iteration}");
            progress(&message);
            day_history.push(history("budget_reached", 100, message));
            break;
        }

        let refined = if config.pipeline.objective.uses_hybrid() && iteration % 2 == 0 {
            hybrid_refine(best_candidate.chains.clone(), &travel, &config.chain, &config.qubo, &mut rng)
        } else {
            run_lns(best_candidate.chains.clone(), &travel, &config.lns, &config.chain, &weights, &mut rng, &budget)
        };

        let refined_buses = chains_to_buses(&refined, &travel, day as u8 as usize);
        let (_refined_incidents, refined_summary) = validate_day(&refined_buses, day, oracle, &config.chain).await;
        let (refined_deadhead, refined_efficiency) = day_efficiency_stats(&refined_buses);
        let refined_rank = compute_rank(
            &refined,
            split_count,
            refined_summary.incidents_error,
            refined_summary.incidents_warning,
            refined_summary.total_buses - refined_summary.feasible_buses,
            refined_deadhead,
            refined_efficiency,
        );

        if rank_less_than(&refined_rank, &best_candidate.rank) {
            best_candidate = DayCandidate { chains: refined, rank: refined_rank };
            progress(&format!("{day:?}: iteration {iteration} improved candidate rank"));
        } else {
            progress(&format!("{day:?}: iteration {iteration} found no improvement"));
            break;
        }
    }

    let best_chains = best_candidate.chains;
    let buses = chains_to_buses(&best_chains, &travel, day as u8 as usize);
    let (incidents, summary) = validate_day(&buses, day, oracle, &config.chain).await;
    let (avg_deadhead, avg_efficiency) = day_efficiency_stats(&buses);

    if summary.incidents_error > 0 {
        split_count = split_count.max(1);
    }

    let report = ValidationReport { incidents, by_day: vec![(day, summary.clone())] };
    let stats = DayStats {
        buses: buses.len() as u32,
        jobs: jobs.len() as u32,
        deadhead_km: avg_deadhead / 60.0 * config.geometry.average_speed_kmh,
        avg_efficiency,
        solver_status: block_solver_status,
    };

    Ok((
        chains_to_buses(&best_chains, &travel, day as u8 as usize),
        report,
        stats,
        dropped,
        lower_bound_buses,
        split_count,
        day_history,
    ))
}

fn now_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

fn history(stage: &str, progress: u8, message: impl Into<String>) -> HistoryEntry {
    HistoryEntry { timestamp_ms: now_ms(), stage: stage.into(), progress, message: message.into(), extra: serde_json::Value::Null }
}

/// Runs the full pipeline across every weekday and aggregates the result.
/// `routes` must already have passed `Route::validate`; the caller is
/// expected to have rejected invalid records during ingestion — this function still defensively re-validates, returning a
/// `PipelineError::InvalidRoute` rather than panicking if one slipped
/// through.
pub async fn run_pipeline(
    routes: Vec<Route>,
    vehicle_registry: Vec<VehicleProfile>,
    config: FullConfig,
    oracle: &TravelTimeOracle,
    progress: InfoLogger,
) -> Result<PipelineResult, PipelineError> {
    for route in &routes {
        route.validate()?;
    }
    if vehicle_registry.iter().all(|p| p.status != crate::model::VehicleStatus::Active) && !vehicle_registry.is_empty() {
        return Err(PipelineError::EmptyFleet);
    }

    let config = config.pipeline.validate().map(|p| FullConfig { pipeline: p, ..config })?;

    let mut history_log = vec![history("start", 0, "pipeline starting")];
    let mut schedule_by_day = Vec::new();
    let mut overall_report = ValidationReport::default();
    let mut total_dropped = 0u32;
    let mut total_lower_bound = 0u32;
    let mut total_split = 0u32;
    let mut day_stats = Vec::new();

    for (idx, day) in Weekday::ALL.iter().enumerate() {
        let day_progress: u8 = ((idx as f64 / Weekday::ALL.len() as f64) * 100.0) as u8;
        history_log.push(history("day_start", day_progress, format!("starting {day:?}")));

        let (buses, report, stats, dropped, lower_bound, splits, day_history) =
            run_day(*day, &routes, &config, oracle, &progress).await?;

        let assigned_buses = assign_fleet(buses, &vehicle_registry, &config.fleet_assign);
        schedule_by_day.push((*day, assigned_buses));
        overall_report.incidents.extend(report.incidents);
        overall_report.by_day.extend(report.by_day);
        total_dropped += dropped;
        total_lower_bound += lower_bound;
        total_split += splits;
        history_log.extend(day_history);
        day_stats.push(stats);

        history_log.push(history("day_done", day_progress, format!("finished {day:?}")));
    }

    let best_buses: u32 = schedule_by_day.iter().map(|(_, buses)| buses.len() as u32).sum();
    let infeasible_buses = overall_report
        .by_day
        .iter()
        .map(|(_, s)| s.total_buses - s.feasible_buses)
        .sum();
    let error_issues = overall_report.incidents.iter().filter(|i| i.severity == crate::model::Severity::Error).count() as u32;
    let avg_deadhead = if day_stats.is_empty() { 0.0 } else { day_stats.iter().map(|s| s.deadhead_km).sum::<Float>() / day_stats.len() as Float };
    let avg_efficiency =
        if day_stats.is_empty() { 0.0 } else { day_stats.iter().map(|s| s.avg_efficiency).sum::<Float>() / day_stats.len() as Float };
    let solver_status =
        day_stats.iter().fold(SolverStatus::Optimal, |acc, s| acc.worst_of(s.solver_status));

    let optimality_gap = if total_lower_bound == 0 { 0.0 } else { ((best_buses as Float) - (total_lower_bound as Float)).max(0.0) / total_lower_bound as Float };

    let fleet_virtual_buses = schedule_by_day.iter().flat_map(|(_, buses)| buses.iter()).filter(|b| b.is_virtual()).count() as u32;
    let fleet_assigned = best_buses - fleet_virtual_buses;

    let all_bus_loads: Vec<u32> = schedule_by_day.iter().flat_map(|(_, buses)| buses.iter()).map(|b| b.items.len() as u32).collect();
    let load_spread_routes = all_bus_loads.iter().max().copied().unwrap_or(0).saturating_sub(all_bus_loads.iter().min().copied().unwrap_or(0));

    let selected_label =
        if total_split > 0 || error_issues > 0 { "select_with_risk".to_string() } else { "select_best".to_string() };

    history_log.push(history("select_best", 100, format!("selected candidate with {best_buses} buses")));

    Ok(PipelineResult {
        schedule_by_day,
        validation_report: overall_report,
        metrics: Metrics {
            best_buses,
            lower_bound_buses: total_lower_bound,
            optimality_gap,
            split_count: total_split,
            infeasible_buses,
            load_spread_routes,
            avg_deadhead,
            avg_efficiency,
            fleet_assigned,
            fleet_virtual_buses,
            solver_status,
        },
        history: history_log,
        selected_candidate_label: selected_label,
    })
}

#[cfg(test)]
#[path = "../tests/unit/pipeline_test.rs"]
mod pipeline_test;
