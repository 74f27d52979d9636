//! QUBO hybrid refiner: encodes the reinsertion of
//! conflict-heavy ("hot") routes as a one-hot assignment QUBO and solves
//! it with simulated annealing restricted to one-hot neighborhoods.

use crate::config::QuboConfig;
use fleet_heuristics::random::DefaultRandom;
use fleet_heuristics::Float;

/// One candidate placement for a hot route: assign it to `target_bus` (or
/// `None` for the synthetic "open a new bus" candidate) at `insertion_index`,
/// with the given local reinsertion cost and occupied time window.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub target_bus: Option<usize>,
    pub insertion_index: usize,
    pub cost: Float,
    pub start_min: Float,
    pub end_min: Float,
}

/// All candidates for one hot route; exactly one must be chosen.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteCandidates {
    pub route_id: String,
    pub candidates: Vec<Candidate>,
}

/// The QUBO instance assembled from a set of hot routes' candidates.
pub struct QuboProblem {
    pub groups: Vec<RouteCandidates>,
}

impl QuboProblem {
    /// Builds candidates for `routes`, capping the number of hot routes
    /// and candidates-per-route per `cfg`, and appending the synthetic
    /// "new bus" candidate to every group. Trims least-critical routes
    /// (by ranking weight, lowest first) if the flattened variable count
    /// would exceed `cfg.max_variables`.
    pub fn build(mut per_route: Vec<RouteCandidates>, cfg: &QuboConfig) -> QuboProblem {
        per_route.truncate(cfg.max_hot_routes);
        for group in per_route.iter_mut() {
            group.candidates.truncate(cfg.max_candidates_per_route.saturating_sub(1));
            group.candidates.push(Candidate {
                target_bus: None,
                insertion_index: 0,
                cost: cfg.new_bus_candidate_cost,
                start_min: 0.0,
                end_min: 0.0,
            });
        }

        while total_variables(&per_route) > cfg.max_variables && per_route.len() > 1 {
            per_route.pop();
        }

        QuboProblem { groups: per_route }
    }

    /// Flattens `(group_index, candidate_index)` into a single variable
    /// index, matching the order used by `evaluate`/`solve`.
    fn flat_index(&self, group: usize, candidate: usize) -> usize {
        self.groups[..group].iter().map(|g| g.candidates.len()).sum::<usize>() + candidate
    }
}

fn total_variables(groups: &[RouteCandidates]) -> usize {
    groups.iter().map(|g| g.candidates.len()).sum()
}

/// Assignment: selected candidate index within each group.
pub type Selection = Vec<usize>;

/// Diagonal + conflict-penalty objective, equivalent to expanding the
/// one-hot constraint `λ_assign · (Σx_k − 1)²` and the per-bus conflict
/// penalty directly in selection space (rather than materializing the
/// full `n×n` QUBO matrix, since every group is already constrained to
/// choose exactly one candidate by construction).
fn objective(problem: &QuboProblem, selection: &Selection, cfg: &QuboConfig) -> Float {
    let mut total = 0.0;
    for (g_idx, group) in problem.groups.iter().enumerate() {
        total += group.candidates[selection[g_idx]].cost;
    }

    for g1 in 0..problem.groups.len() {
        let c1 = &problem.groups[g1].candidates[selection[g1]];
        let Some(bus1) = c1.target_bus else { continue };
        for g2 in (g1 + 1)..problem.groups.len() {
            let c2 = &problem.groups[g2].candidates[selection[g2]];
            if c2.target_bus != Some(bus1) {
                continue;
            }
            if windows_overlap(c1.start_min, c1.end_min, c2.start_min, c2.end_min) {
                total += cfg.bus_conflict_penalty;
            }
        }
    }
    total
}

fn windows_overlap(a_start: Float, a_end: Float, b_start: Float, b_end: Float) -> bool {
    a_start < b_end && b_start < a_end
}

/// Per-connection insertion penalty, reproduced exactly from the
/// validator's overlap/buffer bands: overlap is punished far harder than
/// a merely tight buffer, and a generous buffer past the recommended
/// margin is mildly discouraged (it wastes slack that could host another
/// route). `time_available` is `start(right) - end(left)`; `buffer` is
/// `time_available - travel_time`.
pub fn connection_penalty(time_available: Float, buffer: Float) -> Float {
    if time_available < 0.0 {
        2200.0 + time_available.abs() * 80.0
    } else if buffer < 0.0 {
        900.0 + buffer.abs() * 45.0
    } else if buffer < 5.0 {
        120.0 + (5.0 - buffer) * 20.0
    } else if buffer > 35.0 {
        (buffer - 35.0) * 0.8
    } else {
        0.0
    }
}

/// Solves the QUBO via simulated annealing over one-hot neighborhoods
/// (each move flips which candidate is active within one route's group),
/// cooling geometrically from `start_temperature` to `end_temperature`
/// over `max_iterations`. Returns the best selection found; if annealing
/// never improves on the all-default-candidate baseline, that baseline is
/// returned unchanged.
pub fn solve(problem: &QuboProblem, cfg: &QuboConfig, rng: &mut DefaultRandom) -> Selection {
    if problem.groups.is_empty() {
        return Vec::new();
    }

    let mut current: Selection = vec![0; problem.groups.len()];
    let mut current_cost = objective(problem, &current, cfg);
    let mut best = current.clone();
    let mut best_cost = current_cost;

    let ratio = if cfg.max_iterations > 1 {
        (cfg.end_temperature / cfg.start_temperature).powf(1.0 / (cfg.max_iterations as Float - 1.0))
    } else {
        1.0
    };
    let mut temperature = cfg.start_temperature;

    for _ in 0..cfg.max_iterations {
        let group = rng.uniform_int(0, problem.groups.len() as i64 - 1) as usize;
        let n_candidates = problem.groups[group].candidates.len();
        if n_candidates <= 1 {
            temperature *= ratio;
            continue;
        }
        let new_candidate = rng.uniform_int(0, n_candidates as i64 - 1) as usize;
        if new_candidate == current[group] {
            temperature *= ratio;
            continue;
        }

        let mut candidate_selection = current.clone();
        candidate_selection[group] = new_candidate;
        let candidate_cost = objective(problem, &candidate_selection, cfg);
        let delta = candidate_cost - current_cost;

        if delta < 0.0 || rng.uniform_real() < (-delta / temperature.max(1e-6)).exp() {
            current = candidate_selection;
            current_cost = candidate_cost;
            if current_cost < best_cost - 1e-9 {
                best_cost = current_cost;
                best = current.clone();
            }
        }

        temperature *= ratio;
    }

    if best_cost > objective(problem, &vec![0; problem.groups.len()], cfg) + 1e-9 {
        vec![0; problem.groups.len()]
    } else {
        best
    }
}

/// Flat variable indices selected as "on" in `selection`, for diagnostics.
pub fn selected_variable_indices(problem: &QuboProblem, selection: &Selection) -> Vec<usize> {
    selection.iter().enumerate().map(|(g, &c)| problem.flat_index(g, c)).collect()
}

#[cfg(test)]
#[path = "../tests/unit/qubo_test.rs"]
mod qubo_test;
