use super::*;
use crate::geometry::LatLng;
use crate::model::{Block, Job, RouteKind, TimeShift};

fn chain_ending_at(route_id: &str, end_anchor: Float, duration: Float) -> Chain {
    let job = Job {
        route_id: route_id.into(),
        block: Block::MorningEntry,
        anchor_time_min: end_anchor - duration,
        duration_min: duration,
        start_loc: LatLng::new(42.24, -8.72),
        end_loc: LatLng::new(42.25, -8.73),
        capacity_needed: 10,
        school_name: "School A".into(),
        contract_id: "C1".into(),
        kind: RouteKind::Entry,
        unchainable: false,
        vehicle_capacity_min: None,
        vehicle_capacity_max: None,
        peak_stop_passengers: 0,
    };
    Chain { jobs: vec![job], shifts: vec![TimeShift { shift_min: 0.0 }] }
}

fn chain_starting_at(route_id: &str, start_anchor: Float, duration: Float) -> Chain {
    let job = Job {
        route_id: route_id.into(),
        block: Block::EarlyAfternoonExit,
        anchor_time_min: start_anchor,
        duration_min: duration,
        start_loc: LatLng::new(42.25, -8.73),
        end_loc: LatLng::new(42.26, -8.74),
        capacity_needed: 10,
        school_name: "School A".into(),
        contract_id: "C1".into(),
        kind: RouteKind::Exit,
        unchainable: false,
        vehicle_capacity_min: None,
        vehicle_capacity_max: None,
        peak_stop_passengers: 0,
    };
    Chain { jobs: vec![job], shifts: vec![TimeShift { shift_min: 0.0 }] }
}

#[test]
fn merges_tail_and_head_when_travel_feasible() {
    let tails = vec![chain_ending_at("R1", 9 * 60, 30.0)];
    let heads = vec![chain_starting_at("R3", 14 * 60, 30.0)];
    let cfg = ChainConfig::default();
    let merged = merge_adjacent_blocks(tails, heads, &cfg, |_t, _h| Some(0.0));
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].jobs.len(), 2);
    assert_eq!(merged[0].jobs[0].route_id, "R1");
    assert_eq!(merged[0].jobs[1].route_id, "R3");
}

#[test]
fn infeasible_pair_stays_unmerged() {
    let tails = vec![chain_ending_at("R1", 9 * 60, 30.0)];
    let heads = vec![chain_starting_at("R3", 14 * 60, 30.0)];
    let cfg = ChainConfig::default();
    let merged = merge_adjacent_blocks(tails, heads, &cfg, |_t, _h| None);
    assert_eq!(merged.len(), 2);
}

#[test]
fn empty_heads_passes_tails_through() {
    let tails = vec![chain_ending_at("R1", 9 * 60, 30.0)];
    let cfg = ChainConfig::default();
    let merged = merge_adjacent_blocks(tails, Vec::new(), &cfg, |_t, _h| Some(0.0));
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].jobs[0].route_id, "R1");
}

#[test]
fn prefers_smaller_idle_gap_when_both_heads_feasible() {
    let tails = vec![chain_ending_at("R1", 9 * 60, 30.0)];
    let heads = vec![chain_starting_at("Rclose", 9 * 60 + 30, 30.0), chain_starting_at("Rfar", 16 * 60, 30.0)];
    let cfg = ChainConfig::default();
    let merged = merge_adjacent_blocks(tails, heads, &cfg, |_t, _h| Some(0.0));
    // Only one match is made (tails.len() == 1); it should pick the
    // smaller idle gap since travel cost is identical for both heads.
    let merged_chain = merged.iter().find(|c| c.jobs.len() == 2).expect("one merge expected");
    assert_eq!(merged_chain.jobs[1].route_id, "Rclose");
}
