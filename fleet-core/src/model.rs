//! The core data model: stops, routes, jobs, chains, schedules and results.
//!
//! Routes are read-only inputs; jobs are derived per run; chains are mutated
//! by refinement passes; bus schedules are the final, immutable output of a
//! run. No intermediate state outlives the orchestrator call that produced
//! it.

use crate::error::PipelineError;
use crate::geometry::LatLng;
use fleet_heuristics::Float;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single stop along a route. Immutable after ingestion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    pub lat: Float,
    pub lon: Float,
    pub order: u32,
    pub time_from_start_min: Float,
    pub is_school: bool,
    pub passengers: u32,
}

impl Stop {
    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

/// Which direction a route runs: picking children up for school, or
/// returning them home.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Entry,
    Exit,
}

/// Day of the week a route may operate on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri];
}

/// An input transport route, as handed to the core by the ingestion
/// collaborator. The ingester is required to enforce the invariants
/// documented on each field; the core defensively re-checks only the
/// cheapest of them (at least one stop, exactly one anchor time) and
/// otherwise trusts its input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub stops: Vec<Stop>,
    pub school_id: String,
    pub school_name: String,
    /// Set iff `kind == Entry`.
    pub arrival_time: Option<Float>,
    /// Set iff `kind == Exit`.
    pub departure_time: Option<Float>,
    pub capacity_needed: u32,
    pub contract_id: String,
    pub kind: RouteKind,
    pub days: HashSet<Weekday>,
    /// Optional contracted vehicle-capacity hints, carried through to the
    /// `Job`/`ScheduleItem` derived from this route. Only consulted by
    /// `fleet_assign::item_required_seats` once `capacity_needed` and the
    /// stops' own passenger counts are both silent.
    #[serde(default)]
    pub vehicle_capacity_min: Option<u32>,
    #[serde(default)]
    pub vehicle_capacity_max: Option<u32>,
}

impl Route {
    /// Validates the invariants the ingester is required to enforce. The
    /// core calls this once at pipeline entry and rejects the whole batch
    /// on violation rather than silently repairing bad input.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.stops.is_empty() {
            return Err(PipelineError::InvalidRoute {
                route_id: self.id.clone(),
                reason: "route has no stops".into(),
            });
        }
        let anchor_set = match self.kind {
            RouteKind::Entry => (self.arrival_time.is_some(), self.departure_time.is_none()),
            RouteKind::Exit => (self.departure_time.is_some(), self.arrival_time.is_none()),
        };
        if !(anchor_set.0 && anchor_set.1) {
            return Err(PipelineError::InvalidRoute {
                route_id: self.id.clone(),
                reason: "exactly one of arrival_time/departure_time must be set, matching kind".into(),
            });
        }
        Ok(())
    }

    /// The pinned clock time for this route: arrival for entries,
    /// departure for exits.
    pub fn anchor_time_min(&self) -> Float {
        match self.kind {
            RouteKind::Entry => self.arrival_time.unwrap_or(0.0),
            RouteKind::Exit => self.departure_time.unwrap_or(0.0),
        }
    }

    pub fn duration_min(&self, floor_min: Float) -> Float {
        let max_offset = self.stops.iter().map(|s| s.time_from_start_min).fold(0.0, Float::max);
        max_offset.max(floor_min)
    }

    /// The most passengers carried at any single stop, used by
    /// `fleet_assign::item_required_seats` when `capacity_needed` is silent.
    pub fn peak_stop_passengers(&self) -> u32 {
        self.stops.iter().map(|s| s.passengers).max().unwrap_or(0)
    }

    /// First stop is boarding for entries, last stop is boarding for exits;
    /// the other end is the school.
    pub fn start_location(&self) -> LatLng {
        match self.kind {
            RouteKind::Entry => self.stops.first(),
            RouteKind::Exit => self.stops.last(),
        }
        .map(Stop::location)
        .unwrap_or(LatLng::new(0.0, 0.0))
    }

    pub fn end_location(&self) -> LatLng {
        match self.kind {
            RouteKind::Entry => self.stops.last(),
            RouteKind::Exit => self.stops.first(),
        }
        .map(Stop::location)
        .unwrap_or(LatLng::new(0.0, 0.0))
    }
}

/// One of the four disjoint anchor-time windows jobs are classified into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    MorningEntry,
    EarlyAfternoonExit,
    LateAfternoonEntry,
    LateAfternoonExit,
}

impl Block {
    pub const ORDER: [Block; 4] =
        [Block::MorningEntry, Block::EarlyAfternoonExit, Block::LateAfternoonEntry, Block::LateAfternoonExit];
}

/// A normalized, block-tagged unit of work derived from a `Route` for one
/// operating day. Jobs are keyed by route id within a day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub route_id: String,
    pub block: Block,
    pub anchor_time_min: Float,
    pub duration_min: Float,
    pub start_loc: LatLng,
    pub end_loc: LatLng,
    pub capacity_needed: u32,
    pub school_name: String,
    pub contract_id: String,
    pub kind: RouteKind,
    /// Routes with degenerate coordinates may only appear alone in a chain.
    pub unchainable: bool,
    pub vehicle_capacity_min: Option<u32>,
    pub vehicle_capacity_max: Option<u32>,
    /// Peak `stops[].passengers` seen on the originating route, used by
    /// `fleet_assign::item_required_seats` as the fallback ahead of the
    /// vehicle-capacity echoes.
    pub peak_stop_passengers: u32,
}

/// A directed feasibility edge between two jobs of the same block: job `j`
/// may directly follow job `i` on the same bus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeasibilityArc {
    pub from: usize,
    pub to: usize,
    pub travel_min: Float,
    pub weight: Float,
}

/// A per-job time adjustment applied while stitching jobs into a chain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeShift {
    pub shift_min: Float,
}

/// An ordered, feasibility-respecting sequence of jobs assigned to one bus
/// within a single day, prior to fleet assignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub jobs: Vec<Job>,
    pub shifts: Vec<TimeShift>,
}

impl Chain {
    pub fn single(job: Job) -> Self {
        Self { shifts: vec![TimeShift { shift_min: 0.0 }], jobs: vec![job] }
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn start_anchor(&self) -> Option<Float> {
        self.jobs.first().map(|j| j.anchor_time_min)
    }

    pub fn end_time(&self) -> Option<Float> {
        self.jobs.last().zip(self.shifts.last()).map(|(j, s)| j.anchor_time_min + s.shift_min + j.duration_min)
    }
}

/// A scheduled occurrence of one route on a bus, derived from a `Job`
/// placed inside a `Chain`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub route_id: String,
    pub start_time: Float,
    pub end_time: Float,
    pub kind: RouteKind,
    pub original_start_time: Float,
    pub time_shift_min: Float,
    pub deadhead_min: Float,
    pub capacity_needed: u32,
    pub stops: Vec<Stop>,
    pub school_name: String,
    pub contract_id: String,
    pub vehicle_capacity_min: Option<u32>,
    pub vehicle_capacity_max: Option<u32>,
    pub peak_stop_passengers: u32,
}

/// An active vehicle available for assignment. Only `status == Active`
/// profiles are candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Active,
    Inactive,
    Maintenance,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub id: String,
    pub code: Option<u32>,
    pub plate: String,
    pub seats_min: u32,
    pub seats_max: u32,
    pub status: VehicleStatus,
}

/// An in-memory vehicle fleet, constructed once per ingestion with a
/// case-insensitive uniqueness check on `plate` and `code` so two profiles
/// can never silently shadow each other during fleet assignment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VehicleRegistry {
    profiles: Vec<VehicleProfile>,
}

impl VehicleRegistry {
    /// Fails with `PipelineError::InvalidConfig` if any two profiles share
    /// a plate or a numeric code (compared case-insensitively on plate).
    pub fn new(profiles: Vec<VehicleProfile>) -> Result<Self, PipelineError> {
        let mut seen_plates: HashSet<String> = HashSet::new();
        let mut seen_codes: HashSet<u32> = HashSet::new();
        for profile in &profiles {
            let plate_key = profile.plate.to_ascii_lowercase();
            if !seen_plates.insert(plate_key) {
                return Err(PipelineError::InvalidConfig(format!("duplicate vehicle plate: {}", profile.plate)));
            }
            if let Some(code) = profile.code {
                if !seen_codes.insert(code) {
                    return Err(PipelineError::InvalidConfig(format!("duplicate vehicle code: {code}")));
                }
            }
        }
        Ok(Self { profiles })
    }

    pub fn profiles(&self) -> &[VehicleProfile] {
        &self.profiles
    }

    pub fn into_profiles(self) -> Vec<VehicleProfile> {
        self.profiles
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }
}

/// Identifies a vehicle assigned to a bus schedule, or the absence of one
/// (a "virtual" bus that no real vehicle could cover).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignedVehicle {
    pub id: String,
    pub code: Option<u32>,
    pub plate: String,
    pub seats_min: u32,
    pub seats_max: u32,
}

/// A single bus's schedule for one day: an ordered set of items, plus the
/// vehicle (if any) matched to cover it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusSchedule {
    pub bus_id: String,
    pub items: Vec<ScheduleItem>,
    pub min_required_seats: u32,
    pub assigned_vehicle: Option<AssignedVehicle>,
    /// Set explicitly by `fleet_assign::assign_fleet` rather than derived
    /// from `assigned_vehicle.is_some()`, so a caller can tell "no vehicle
    /// could cover this bus" apart from "fleet assignment hasn't run yet"
    /// (both otherwise look like `assigned_vehicle == None`).
    pub uses_fleet_profile: bool,
}

impl BusSchedule {
    pub fn is_virtual(&self) -> bool {
        !self.uses_fleet_profile
    }
}

/// Category of a validation finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    InsufficientTime,
    TightBuffer,
    OverlappingRoutes,
    InvalidTimeRange,
    CapacityExceeded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One feasibility or capacity problem found between (or within) schedule
/// items, produced by the validator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationIncident {
    pub route_a: String,
    pub route_b: Option<String>,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub time_available: Float,
    pub travel_time: Float,
    pub buffer_min: Float,
    pub day: Weekday,
    pub bus_id: String,
    pub suggested_start: Option<Float>,
}

/// Aggregated validator output for one day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DayValidationSummary {
    pub total_buses: u32,
    pub feasible_buses: u32,
    pub incidents_error: u32,
    pub incidents_warning: u32,
    pub incidents_info: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub incidents: Vec<ValidationIncident>,
    pub by_day: Vec<(Weekday, DayValidationSummary)>,
}

/// Outcome status of the per-block chain-building solve, worst-case
/// across a day's four blocks (see [`crate::chain_builder`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// The matching solve completed with no mid-chain splits.
    #[default]
    Optimal,
    /// The matching solve completed but one or more chains required a
    /// mid-chain split during time-shift application.
    OptimalWithSplits,
    /// The block's wall-clock budget was exhausted before the solve could
    /// run; a conservative retry (ML ranking disabled) was attempted
    /// before falling back further. See [`SolverStatus::FallbackRoutePerBus`]
    /// for what happens if the retry also times out.
    Timeout,
    /// No feasible chain cover exists under the given constraints. Never
    /// produced by the matching-based chain builder: minimum path cover
    /// over an acyclic feasibility DAG always admits the trivial cover of
    /// one singleton chain per job, so there is no input this solver
    /// rejects as infeasible (see `DESIGN.md`'s note on the ILP-to-matching
    /// substitution). Kept in the taxonomy for parity with
    /// [`crate::error::SolverError`] and so a future non-matching solver
    /// swap has somewhere to report it.
    Infeasible,
    /// Both the primary solve and its conservative retry timed out; every
    /// job in the block was assigned its own singleton chain as a safety
    /// net rather than left unscheduled.
    FallbackRoutePerBus,
}

/// Per-day descriptive statistics over a candidate's schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DayStats {
    pub buses: u32,
    pub jobs: u32,
    pub deadhead_km: Float,
    pub avg_efficiency: Float,
    pub solver_status: SolverStatus,
}

/// Top-level optimization metrics, reported once per pipeline run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub best_buses: u32,
    pub lower_bound_buses: u32,
    pub optimality_gap: Float,
    pub split_count: u32,
    pub infeasible_buses: u32,
    pub load_spread_routes: u32,
    pub avg_deadhead: Float,
    pub avg_efficiency: Float,
    pub fleet_assigned: u32,
    pub fleet_virtual_buses: u32,
    /// Worst [`SolverStatus`] observed across every day and block in this
    /// run, ranked `FallbackRoutePerBus` > `Timeout` > `Infeasible` >
    /// `OptimalWithSplits` > `Optimal`.
    pub solver_status: SolverStatus,
}

impl SolverStatus {
    /// Ranks statuses from least to most degraded, for folding many
    /// per-block statuses into one worst-case summary.
    fn severity_rank(self) -> u8 {
        match self {
            SolverStatus::Optimal => 0,
            SolverStatus::OptimalWithSplits => 1,
            SolverStatus::Infeasible => 2,
            SolverStatus::Timeout => 3,
            SolverStatus::FallbackRoutePerBus => 4,
        }
    }

    /// Combines two statuses, keeping whichever is more degraded.
    pub fn worst_of(self, other: Self) -> Self {
        if other.severity_rank() > self.severity_rank() {
            other
        } else {
            self
        }
    }
}

/// One entry in the pipeline's timestamped history trace. `progress` is
/// monotonically non-decreasing within a `stage`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp_ms: u64,
    pub stage: String,
    pub progress: u8,
    pub message: String,
    pub extra: serde_json::Value,
}

/// The full output of one pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub schedule_by_day: Vec<(Weekday, Vec<BusSchedule>)>,
    pub validation_report: ValidationReport,
    pub metrics: Metrics,
    pub history: Vec<HistoryEntry>,
    pub selected_candidate_label: String,
}
