//! Feasibility validator: re-checks every chain transition
//! against the travel-time oracle and produces incident reports.

use crate::config::ChainConfig;
use crate::geometry::LatLng;
use crate::model::{BusSchedule, DayValidationSummary, IssueType, Severity, ValidationIncident, Weekday};
use crate::oracle::TravelTimeOracle;
use fleet_heuristics::Float;

/// Validates every adjacent transition in one bus's schedule for one day,
/// appending incidents found to `incidents` and returning whether every
/// transition was feasible.
pub async fn validate_bus(
    bus: &BusSchedule,
    day: Weekday,
    oracle: &TravelTimeOracle,
    cfg: &ChainConfig,
    incidents: &mut Vec<ValidationIncident>,
) -> bool {
    let mut feasible = true;

    for window in bus.items.windows(2) {
        let current = &window[0];
        let next = &window[1];

        let time_available = next.start_time - current.end_time;
        if time_available < 0.0 {
            feasible = false;
            incidents.push(ValidationIncident {
                route_a: current.route_id.clone(),
                route_b: Some(next.route_id.clone()),
                issue_type: IssueType::OverlappingRoutes,
                severity: Severity::Error,
                time_available,
                travel_time: 0.0,
                buffer_min: time_available,
                day,
                bus_id: bus.bus_id.clone(),
                suggested_start: None,
            });
            continue;
        }

        let end_loc = current.stops.last().map(|s| s.location()).unwrap_or(LatLng::new(0.0, 0.0));
        let start_loc = next.stops.first().map(|s| s.location()).unwrap_or(LatLng::new(0.0, 0.0));
        let travel = oracle.travel(end_loc, start_loc).await.map(|e| e.minutes).unwrap_or(0.0);
        let buffer = time_available - travel;

        if buffer < 0.0 {
            feasible = false;
            incidents.push(ValidationIncident {
                route_a: current.route_id.clone(),
                route_b: Some(next.route_id.clone()),
                issue_type: IssueType::InsufficientTime,
                severity: Severity::Error,
                time_available,
                travel_time: travel,
                buffer_min: buffer,
                day,
                bus_id: bus.bus_id.clone(),
                suggested_start: Some(current.end_time + travel + cfg.min_buffer_min),
            });
        } else if buffer < cfg.min_buffer_min {
            incidents.push(ValidationIncident {
                route_a: current.route_id.clone(),
                route_b: Some(next.route_id.clone()),
                issue_type: IssueType::TightBuffer,
                severity: Severity::Warning,
                time_available,
                travel_time: travel,
                buffer_min: buffer,
                day,
                bus_id: bus.bus_id.clone(),
                suggested_start: None,
            });
        }
    }

    feasible
}

/// Validates every bus scheduled on `day`, producing the aggregated
/// per-day summary. Oracle calls for different buses are
/// issued concurrently; the oracle's own semaphore bounds how many reach
/// the network at once.
pub async fn validate_day(
    buses: &[BusSchedule],
    day: Weekday,
    oracle: &TravelTimeOracle,
    cfg: &ChainConfig,
) -> (Vec<ValidationIncident>, DayValidationSummary) {
    let per_bus = buses.iter().map(|bus| async move {
        let mut local_incidents = Vec::new();
        let feasible = validate_bus(bus, day, oracle, cfg, &mut local_incidents).await;
        (local_incidents, feasible)
    });
    let results = futures::future::join_all(per_bus).await;

    let mut all_incidents = Vec::new();
    let mut feasible_count = 0u32;
    for (mut incidents, feasible) in results {
        all_incidents.append(&mut incidents);
        if feasible {
            feasible_count += 1;
        }
    }

    let summary = DayValidationSummary {
        total_buses: buses.len() as u32,
        feasible_buses: feasible_count,
        incidents_error: all_incidents.iter().filter(|i| i.severity == Severity::Error).count() as u32,
        incidents_warning: all_incidents.iter().filter(|i| i.severity == Severity::Warning).count() as u32,
        incidents_info: all_incidents.iter().filter(|i| i.severity == Severity::Info).count() as u32,
    };

    (all_incidents, summary)
}

/// Computes average deadhead (minutes) and average efficiency
/// (productive-time / total-time) across a day's buses, used by the
/// candidate ranker.
pub fn day_efficiency_stats(buses: &[BusSchedule]) -> (Float, Float) {
    if buses.is_empty() {
        return (0.0, 0.0);
    }
    let mut total_deadhead = 0.0;
    let mut total_efficiency = 0.0;
    for bus in buses {
        let deadhead: Float = bus.items.iter().map(|i| i.deadhead_min).sum();
        let productive: Float = bus.items.iter().map(|i| i.end_time - i.start_time).sum();
        let span = bus
            .items
            .first()
            .zip(bus.items.last())
            .map(|(first, last)| (last.end_time - first.start_time).max(1.0))
            .unwrap_or(1.0);
        total_deadhead += deadhead;
        total_efficiency += productive / span;
    }
    (total_deadhead / buses.len() as Float, total_efficiency / buses.len() as Float)
}

#[cfg(test)]
#[path = "../tests/unit/validator_test.rs"]
mod validator_test;
