//! Typed configuration for every tunable of the pipeline.
//!
//! Every constant this crate relies on is surfaced here as a `Default`
//! value, never hardcoded at the call site.

use serde::{Deserialize, Serialize};

/// Selects the LNS weight preset and whether QUBO hybrid iterations run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Minimize bus count above all else; viability (zero splits) is a hard
    /// secondary goal. LNS only.
    MinBusesViability,
    /// Same as `MinBusesViability`, but alternates LNS iterations with QUBO
    /// hybrid refinement passes on conflict-heavy routes.
    MinBusesViabilityHybrid,
    /// A softer weighting that also rewards load balance and efficiency.
    Balanced,
}

impl Default for Objective {
    fn default() -> Self {
        Objective::MinBusesViability
    }
}

impl Objective {
    /// Whether this objective enables QUBO hybrid refinement iterations.
    pub fn uses_hybrid(&self) -> bool {
        matches!(self, Objective::MinBusesViabilityHybrid)
    }

    pub fn weights(&self) -> ObjectiveWeights {
        match self {
            Objective::MinBusesViability | Objective::MinBusesViabilityHybrid => {
                ObjectiveWeights::default()
            }
            Objective::Balanced => ObjectiveWeights {
                buses: 300.0,
                deadhead_km: 15.0,
                overtime_hours: 60.0,
                shift_minutes: 8.0,
                load_balance_variance: 40.0,
                fuel_km: 0.2,
                co2_km: 0.02,
            },
        }
    }
}

/// Weighted multi-objective score components:
/// `S = w_buses*|chains| + w_deadhead*deadhead_km + w_overtime*overtime_h
///    + w_shift*shift_min + w_balance*variance(jobs_per_bus)
///    + w_fuel*total_km + w_co2*total_km`.
///
/// Defaults weight bus count three orders of magnitude above the rest,
/// consistent with a "bus count first" framing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub buses: f64,
    pub deadhead_km: f64,
    pub overtime_hours: f64,
    pub shift_minutes: f64,
    pub load_balance_variance: f64,
    pub fuel_km: f64,
    pub co2_km: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            buses: 1000.0,
            deadhead_km: 10.0,
            overtime_hours: 50.0,
            shift_minutes: 5.0,
            load_balance_variance: 20.0,
            fuel_km: 0.15,
            co2_km: 0.01,
        }
    }
}

/// Per-block anchor-time windows, in minutes-of-day, half-open `[start,
/// end)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockWindows {
    pub morning_entry: (u32, u32),
    pub early_afternoon_exit: (u32, u32),
    pub late_afternoon_entry: (u32, u32),
    pub late_afternoon_exit: (u32, u32),
    /// Earliest clock time (minutes-of-day) any job may be shifted to.
    pub min_start_hour: u32,
}

impl Default for BlockWindows {
    fn default() -> Self {
        Self {
            morning_entry: (5 * 60, 12 * 60),
            early_afternoon_exit: (12 * 60, 15 * 60),
            late_afternoon_entry: (15 * 60, 18 * 60),
            late_afternoon_exit: (15 * 60, 21 * 60),
            min_start_hour: 5,
        }
    }
}

/// Geometry/time constants for the straight-line travel-time fallback.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    pub average_speed_kmh: f64,
    pub tortuosity_factor: f64,
    pub fallback_floor_min: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self { average_speed_kmh: 45.0, tortuosity_factor: 1.2, fallback_floor_min: 5.0 }
    }
}

/// Feasibility-arc and chain-split tolerances.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Minimum operational slack required between two adjacent jobs.
    pub min_buffer_min: f64,
    /// Maximum allowed accumulated time shift before a chain must split.
    pub max_time_shift_min: f64,
    /// Arc weight base so that "an edge exists" always outweighs deadhead.
    pub large_weight: f64,
    /// Duration floor applied to jobs with degenerate stop sequences.
    pub duration_floor_min: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { min_buffer_min: 5.0, max_time_shift_min: 15.0, large_weight: 1000.0, duration_floor_min: 15.0 }
    }
}

/// Travel-time oracle tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub cache_ttl_secs: u64,
    pub negative_cache_ttl_secs: u64,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_concurrent_calls: usize,
    pub fallback_enabled: bool,
    pub per_call_timeout_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 24 * 3600,
            negative_cache_ttl_secs: 60,
            max_retries: 2,
            base_backoff_ms: 200,
            max_concurrent_calls: default_semaphore_permits(),
            fallback_enabled: true,
            per_call_timeout_ms: 5_000,
        }
    }
}

/// `min(2 * logical cores, 12)`.
pub fn default_semaphore_permits() -> usize {
    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    (2 * cores).min(12)
}

/// LNS refinement tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LnsConfig {
    pub destroy_rate: f64,
    pub min_destroy_rate: f64,
    pub max_destroy_rate: f64,
    pub max_iterations: usize,
    pub max_no_improvement: usize,
    pub time_limit_secs: f64,
    pub cooling_rate: f64,
    pub initial_temperature: f64,
    pub adaptive_destroy: bool,
}

impl Default for LnsConfig {
    fn default() -> Self {
        Self {
            destroy_rate: 0.3,
            min_destroy_rate: 0.1,
            max_destroy_rate: 0.5,
            max_iterations: 100,
            max_no_improvement: 20,
            time_limit_secs: 300.0,
            cooling_rate: 0.95,
            initial_temperature: 100.0,
            adaptive_destroy: true,
        }
    }
}

/// QUBO hybrid refiner tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuboConfig {
    pub assignment_penalty: f64,
    pub bus_conflict_penalty: f64,
    pub max_hot_routes: usize,
    pub max_buses_per_route: usize,
    pub max_candidates_per_route: usize,
    pub new_bus_candidate_cost: f64,
    pub max_variables: usize,
    pub max_iterations: usize,
    pub start_temperature: f64,
    pub end_temperature: f64,
}

impl Default for QuboConfig {
    fn default() -> Self {
        Self {
            assignment_penalty: 900.0,
            bus_conflict_penalty: 250.0,
            max_hot_routes: 18,
            max_buses_per_route: 5,
            max_candidates_per_route: 8,
            new_bus_candidate_cost: 140.0,
            max_variables: 160,
            max_iterations: 3500,
            start_temperature: 6.0,
            end_temperature: 0.05,
        }
    }
}

/// Fleet profile assignment tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FleetAssignConfig {
    pub small_service_max_seats: u32,
    pub small_bus_max_seats: u32,
    pub small_service_penalty_base: f64,
    pub under_min_penalty_per_seat: f64,
}

impl Default for FleetAssignConfig {
    fn default() -> Self {
        Self {
            small_service_max_seats: 9,
            small_bus_max_seats: 25,
            small_service_penalty_base: 120.0,
            under_min_penalty_per_seat: 15.0,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub objective: Objective,
    pub max_duration_sec: u64,
    pub max_iterations: u32,
    pub use_ml_assignment: bool,
    pub invalid_rows_dropped: u32,
    pub balance_load: bool,
    pub load_balance_hard_spread_limit: u32,
    pub load_balance_target_band: u32,
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            objective: Objective::default(),
            max_duration_sec: 300,
            max_iterations: 2,
            use_ml_assignment: true,
            invalid_rows_dropped: 0,
            balance_load: true,
            load_balance_hard_spread_limit: 2,
            load_balance_target_band: 1,
            seed: 0,
        }
    }
}

impl PipelineConfig {
    /// Clamps fields to their operational floors (`max_duration_sec >= 30`),
    /// returning an error for genuinely invalid input rather than silently
    /// coercing it.
    pub fn validate(mut self) -> Result<Self, crate::error::PipelineError> {
        if self.max_duration_sec < 30 {
            self.max_duration_sec = 30;
        }
        if self.max_iterations > 1000 {
            return Err(crate::error::PipelineError::InvalidConfig(
                "max_iterations must be <= 1000".into(),
            ));
        }
        Ok(self)
    }
}

/// Aggregate of every configuration group, passed by reference through the
/// whole pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FullConfig {
    pub pipeline: PipelineConfig,
    pub geometry: GeometryConfig,
    pub blocks: BlockWindows,
    pub chain: ChainConfig,
    pub oracle: OracleConfig,
    pub lns: LnsConfig,
    pub qubo: QuboConfig,
    pub fleet_assign: FleetAssignConfig,
}

impl Default for FullConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            geometry: GeometryConfig::default(),
            blocks: BlockWindows::default(),
            chain: ChainConfig::default(),
            oracle: OracleConfig::default(),
            lns: LnsConfig::default(),
            qubo: QuboConfig::default(),
            fleet_assign: FleetAssignConfig::default(),
        }
    }
}
