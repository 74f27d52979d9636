//! Fleet profile assignment: maps each optimized bus onto
//! the smallest-sufficient real vehicle profile.

use crate::config::FleetAssignConfig;
use crate::model::{AssignedVehicle, BusSchedule, ScheduleItem, VehicleProfile, VehicleStatus};
use fleet_heuristics::Float;

/// Required seats for a single schedule item, tried in order:
/// `capacity_needed` (when positive), then the route's own peak stop
/// passenger count, then the vehicle-capacity echoes carried from
/// ingestion, then a floor of 1 (a bus must fit at least its driver plus
/// one rider to be worth scheduling at all).
pub fn item_required_seats(item: &ScheduleItem) -> u32 {
    if item.capacity_needed > 0 {
        return item.capacity_needed;
    }
    if item.peak_stop_passengers > 0 {
        return item.peak_stop_passengers;
    }
    if let Some(seats) = item.vehicle_capacity_max.or(item.vehicle_capacity_min) {
        if seats > 0 {
            return seats;
        }
    }
    1
}

/// Computes `min_required_seats` for a bus: the maximum required-seats
/// value across its items.
pub fn min_required_seats(bus: &BusSchedule) -> u32 {
    bus.items.iter().map(item_required_seats).max().unwrap_or(0)
}

/// Composite assignment score (lower is better): rewards vehicles whose
/// max seats are close to the requirement, penalizes oversized vehicles
/// on small-service requirements, and penalizes vehicles whose minimum
/// seat floor exceeds the requirement outright.
fn assignment_score(required: u32, vehicle: &VehicleProfile, cfg: &FleetAssignConfig) -> Float {
    let slack = vehicle.seats_max as Float - required as Float;
    let mut score = slack.max(0.0);

    if required <= cfg.small_service_max_seats && vehicle.seats_max > cfg.small_bus_max_seats {
        score += cfg.small_service_penalty_base;
    }
    if vehicle.seats_min > required {
        score += (vehicle.seats_min - required) as Float * cfg.under_min_penalty_per_seat;
    }
    score
}

/// Assigns vehicles to buses for one day. Buses are processed in
/// descending order of required seats so the tightest-fitting vehicles
/// are reserved for the buses that need them most; each vehicle is used
/// at most once. Buses that cannot be matched to any active profile are
/// left with `assigned_vehicle = None` ("virtual").
pub fn assign_fleet(mut buses: Vec<BusSchedule>, profiles: &[VehicleProfile], cfg: &FleetAssignConfig) -> Vec<BusSchedule> {
    let mut active: Vec<&VehicleProfile> =
        profiles.iter().filter(|p| p.status == VehicleStatus::Active).collect();
    active.sort_by_key(|p| p.seats_max);

    for bus in buses.iter_mut() {
        bus.min_required_seats = min_required_seats(bus);
    }
    let mut order: Vec<usize> = (0..buses.len()).collect();
    order.sort_by(|&a, &b| buses[b].min_required_seats.cmp(&buses[a].min_required_seats));

    let mut used = vec![false; active.len()];

    for bus_idx in order {
        let required = buses[bus_idx].min_required_seats;
        let mut best: Option<(usize, Float)> = None;
        for (p_idx, profile) in active.iter().enumerate() {
            if used[p_idx] || profile.seats_max < required {
                continue;
            }
            let score = assignment_score(required, profile, cfg);
            if best.map(|(_, s)| score < s).unwrap_or(true) {
                best = Some((p_idx, score));
            }
        }
        if let Some((p_idx, _)) = best {
            used[p_idx] = true;
            let profile = active[p_idx];
            buses[bus_idx].assigned_vehicle = Some(AssignedVehicle {
                id: profile.id.clone(),
                code: profile.code,
                plate: profile.plate.clone(),
                seats_min: profile.seats_min,
                seats_max: profile.seats_max,
            });
            buses[bus_idx].uses_fleet_profile = true;
        }
    }

    buses
}

#[cfg(test)]
#[path = "../tests/unit/fleet_assign_test.rs"]
mod fleet_assign_test;
