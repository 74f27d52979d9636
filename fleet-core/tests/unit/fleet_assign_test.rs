use super::*;
use crate::model::{RouteKind, ScheduleItem, Stop};

fn stop() -> Stop {
    Stop { name: "s".into(), lat: 40.0, lon: -75.0, order: 0, time_from_start_min: 0.0, is_school: false, passengers: 0 }
}

fn item_with_capacity(capacity: u32) -> ScheduleItem {
    ScheduleItem {
        route_id: "R".into(),
        start_time: 0.0,
        end_time: 30.0,
        kind: RouteKind::Entry,
        original_start_time: 0.0,
        time_shift_min: 0.0,
        deadhead_min: 0.0,
        capacity_needed: capacity,
        stops: vec![stop()],
        school_name: "S".into(),
        contract_id: "C".into(),
        vehicle_capacity_min: None,
        vehicle_capacity_max: None,
        peak_stop_passengers: 0,
    }
}

fn bus(id: &str, capacity: u32) -> BusSchedule {
    BusSchedule {
        bus_id: id.into(),
        items: vec![item_with_capacity(capacity)],
        min_required_seats: 0,
        assigned_vehicle: None,
        uses_fleet_profile: false,
    }
}

fn profile(id: &str, seats_min: u32, seats_max: u32) -> VehicleProfile {
    VehicleProfile { id: id.into(), code: None, plate: id.into(), seats_min, seats_max, status: VehicleStatus::Active }
}

#[test]
fn smaller_vehicle_preferred_over_oversized_match() {
    let buses = vec![bus("B1", 20)];
    let profiles = vec![profile("P22", 10, 22), profile("P55", 10, 55)];
    let result = assign_fleet(buses, &profiles, &FleetAssignConfig::default());
    assert_eq!(result[0].assigned_vehicle.as_ref().unwrap().seats_max, 22);
}

#[test]
fn each_vehicle_used_at_most_once_per_day() {
    let buses = vec![bus("B1", 20), bus("B2", 18)];
    let profiles = vec![profile("P22", 10, 22)];
    let result = assign_fleet(buses, &profiles, &FleetAssignConfig::default());
    let assigned: Vec<_> = result.iter().filter(|b| b.assigned_vehicle.is_some()).collect();
    assert_eq!(assigned.len(), 1);
}

#[test]
fn unmatched_bus_is_left_virtual() {
    let buses = vec![bus("B1", 60)];
    let profiles = vec![profile("P22", 10, 22)];
    let result = assign_fleet(buses, &profiles, &FleetAssignConfig::default());
    assert!(result[0].assigned_vehicle.is_none());
}

#[test]
fn inactive_profiles_are_never_candidates() {
    let buses = vec![bus("B1", 20)];
    let mut profiles = vec![profile("P22", 10, 22)];
    profiles[0].status = VehicleStatus::Inactive;
    let result = assign_fleet(buses, &profiles, &FleetAssignConfig::default());
    assert!(result[0].assigned_vehicle.is_none());
}

#[test]
fn min_required_seats_is_the_max_capacity_across_items() {
    let mut b = bus("B1", 10);
    b.items.push(item_with_capacity(25));
    assert_eq!(min_required_seats(&b), 25);
}
