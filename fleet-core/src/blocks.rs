//! Block classifier & job preparer: turns raw `Route`s for
//! one operating day into block-tagged `Job`s.

use crate::config::{BlockWindows, ChainConfig};
use crate::model::{Block, Job, Route, RouteKind};
use fleet_heuristics::Float;

/// Coordinates within this epsilon of the origin are treated as missing
/// data (common placeholder for "unknown location" in the source feeds).
const DEGENERATE_COORD_EPSILON: Float = 1e-6;

/// Classifies one route into a block by its anchor time, given the
/// configured window boundaries. Returns `None` if the anchor falls
/// outside every configured window (the ingester should not produce such
/// routes, but the core does not assume that).
pub fn classify_block(route: &Route, windows: &BlockWindows) -> Option<Block> {
    let anchor = route.anchor_time_min();
    match route.kind {
        RouteKind::Entry => {
            if in_window(anchor, windows.morning_entry) {
                Some(Block::MorningEntry)
            } else if in_window(anchor, windows.late_afternoon_entry) {
                Some(Block::LateAfternoonEntry)
            } else {
                None
            }
        }
        RouteKind::Exit => {
            if in_window(anchor, windows.early_afternoon_exit) {
                Some(Block::EarlyAfternoonExit)
            } else if in_window(anchor, windows.late_afternoon_exit) {
                Some(Block::LateAfternoonExit)
            } else {
                None
            }
        }
    }
}

fn in_window(anchor: Float, window: (u32, u32)) -> bool {
    anchor >= window.0 as Float && anchor < window.1 as Float
}

/// Builds the `Job` for a route given its classified block, flagging it
/// unchainable when either endpoint has degenerate coordinates.
pub fn prepare_job(route: &Route, block: Block, chain_cfg: &ChainConfig) -> Job {
    let start_loc = route.start_location();
    let end_loc = route.end_location();
    let unchainable = is_degenerate(start_loc.lat, start_loc.lng) || is_degenerate(end_loc.lat, end_loc.lng);

    Job {
        route_id: route.id.clone(),
        block,
        anchor_time_min: route.anchor_time_min(),
        duration_min: route.duration_min(chain_cfg.duration_floor_min),
        start_loc,
        end_loc,
        capacity_needed: route.capacity_needed,
        school_name: route.school_name.clone(),
        contract_id: route.contract_id.clone(),
        kind: route.kind,
        unchainable,
        vehicle_capacity_min: route.vehicle_capacity_min,
        vehicle_capacity_max: route.vehicle_capacity_max,
        peak_stop_passengers: route.peak_stop_passengers(),
    }
}

fn is_degenerate(lat: Float, lng: Float) -> bool {
    lat.abs() < DEGENERATE_COORD_EPSILON && lng.abs() < DEGENERATE_COORD_EPSILON
}

/// Classifies and prepares every route for one day, dropping routes whose
/// anchor does not fall into any configured block (recorded by the caller
/// as `invalid_rows_dropped`).
pub fn prepare_jobs_for_day(
    routes: &[Route],
    windows: &BlockWindows,
    chain_cfg: &ChainConfig,
) -> (Vec<Job>, u32) {
    let mut jobs = Vec::with_capacity(routes.len());
    let mut dropped = 0;
    for route in routes {
        match classify_block(route, windows) {
            Some(block) => jobs.push(prepare_job(route, block, chain_cfg)),
            None => dropped += 1,
        }
    }
    (jobs, dropped)
}

#[cfg(test)]
#[path = "../tests/unit/blocks_test.rs"]
mod blocks_test;
