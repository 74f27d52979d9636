use super::*;
use crate::config::{GeometryConfig, OracleConfig};
use crate::model::{AssignedVehicle, RouteKind, Stop};

fn stop(lat: Float, lon: Float) -> Stop {
    Stop { name: "s".into(), lat, lon, order: 0, time_from_start_min: 0.0, is_school: false, passengers: 0 }
}

fn item(route_id: &str, start: Float, end: Float) -> crate::model::ScheduleItem {
    crate::model::ScheduleItem {
        route_id: route_id.into(),
        start_time: start,
        end_time: end,
        kind: RouteKind::Entry,
        original_start_time: start,
        time_shift_min: 0.0,
        deadhead_min: 0.0,
        capacity_needed: 10,
        stops: vec![stop(40.0, -75.0), stop(40.1, -75.1)],
        school_name: "S".into(),
        contract_id: "C".into(),
        vehicle_capacity_min: None,
        vehicle_capacity_max: None,
        peak_stop_passengers: 0,
    }
}

fn bus(items: Vec<crate::model::ScheduleItem>) -> BusSchedule {
    BusSchedule {
        bus_id: "B1".into(),
        items,
        min_required_seats: 10,
        assigned_vehicle: None::<AssignedVehicle>,
        uses_fleet_profile: false,
    }
}

fn oracle_with_fallback() -> TravelTimeOracle {
    TravelTimeOracle::new(None, GeometryConfig::default(), OracleConfig::default())
}

#[tokio::test]
async fn overlapping_routes_reported_as_error() {
    let schedule = bus(vec![item("R1", 0.0, 100.0), item("R2", 50.0, 150.0)]);
    let oracle = oracle_with_fallback();
    let mut incidents = Vec::new();
    let feasible = validate_bus(&schedule, Weekday::Mon, &oracle, &ChainConfig::default(), &mut incidents).await;
    assert!(!feasible);
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].issue_type, IssueType::OverlappingRoutes);
    assert_eq!(incidents[0].severity, Severity::Error);
}

#[tokio::test]
async fn ample_buffer_produces_no_incident() {
    let schedule = bus(vec![item("R1", 0.0, 30.0), item("R2", 200.0, 230.0)]);
    let oracle = oracle_with_fallback();
    let mut incidents = Vec::new();
    let feasible = validate_bus(&schedule, Weekday::Mon, &oracle, &ChainConfig::default(), &mut incidents).await;
    assert!(feasible);
    assert!(incidents.is_empty());
}

#[tokio::test]
async fn single_item_bus_has_no_transitions_to_check() {
    let schedule = bus(vec![item("R1", 0.0, 30.0)]);
    let oracle = oracle_with_fallback();
    let mut incidents = Vec::new();
    let feasible = validate_bus(&schedule, Weekday::Mon, &oracle, &ChainConfig::default(), &mut incidents).await;
    assert!(feasible);
    assert!(incidents.is_empty());
}

#[tokio::test]
async fn validate_day_aggregates_across_buses() {
    let buses = vec![
        bus(vec![item("R1", 0.0, 30.0), item("R2", 31.0, 60.0)]), // overlapping-ish, tiny buffer
        bus(vec![item("R3", 0.0, 30.0)]),
    ];
    let oracle = oracle_with_fallback();
    let (_incidents, summary) = validate_day(&buses, Weekday::Tue, &oracle, &ChainConfig::default()).await;
    assert_eq!(summary.total_buses, 2);
}

#[test]
fn day_efficiency_stats_on_empty_input_is_zero() {
    assert_eq!(day_efficiency_stats(&[]), (0.0, 0.0));
}
