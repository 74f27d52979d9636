use super::*;
use crate::geometry::LatLng;
use crate::model::Block;
use fleet_heuristics::timing::Budget;
use std::time::Duration;

fn ample_budget() -> Budget {
    Budget::new(Duration::from_secs(60))
}

fn job(route_id: &str, anchor: Float, duration: Float) -> Job {
    Job {
        route_id: route_id.into(),
        block: Block::MorningEntry,
        anchor_time_min: anchor,
        duration_min: duration,
        start_loc: LatLng::new(40.0, -75.0),
        end_loc: LatLng::new(40.1, -75.1),
        capacity_needed: 20,
        school_name: "Lincoln".into(),
        contract_id: "C1".into(),
        kind: RouteKind::Entry,
        unchainable: false,
        vehicle_capacity_min: None,
        vehicle_capacity_max: None,
        peak_stop_passengers: 0,
    }
}

fn square_matrix(n: usize, value: Float) -> Vec<Vec<Float>> {
    vec![vec![value; n]; n]
}

#[test]
fn single_job_forms_single_chain() {
    let jobs = vec![job("R1", 8 * 60, 30.0)];
    let matrix = square_matrix(1, 0.0);
    let (chains, diag) = build_chains_for_block(&jobs, &matrix, &ChainConfig::default(), 5, None, &ample_budget()).unwrap();
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].jobs.len(), 1);
    assert_eq!(diag.split_count, 0);
    assert_eq!(diag.lower_bound_buses, 1);
}

#[test]
fn chainable_pair_merges_into_one_chain() {
    // R1 ends at 08:30+25=08:55, R2 anchor 09:30, travel 15 -> buffer huge.
    let jobs = vec![job("R1", 8 * 60 + 30, 25.0), job("R2", 9 * 60 + 30, 25.0)];
    let matrix = square_matrix(2, 15.0);
    let (chains, diag) = build_chains_for_block(&jobs, &matrix, &ChainConfig::default(), 5, None, &ample_budget()).unwrap();
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].jobs.len(), 2);
    assert_eq!(diag.split_count, 0);
    assert_eq!(diag.lower_bound_buses, 1);
}

#[test]
fn long_travel_forces_two_separate_buses() {
    let jobs = vec![job("R1", 8 * 60 + 30, 25.0), job("R2", 9 * 60 + 30, 25.0)];
    let matrix = square_matrix(2, 50.0);
    let (chains, diag) = build_chains_for_block(&jobs, &matrix, &ChainConfig::default(), 5, None, &ample_budget()).unwrap();
    assert_eq!(chains.len(), 2);
    assert_eq!(diag.lower_bound_buses, 2);
}

#[test]
fn empty_input_yields_no_chains() {
    let (chains, diag) = build_chains_for_block(&[], &[], &ChainConfig::default(), 5, None, &ample_budget()).unwrap();
    assert!(chains.is_empty());
    assert_eq!(diag.lower_bound_buses, 0);
    assert_eq!(diag.split_count, 0);
}

#[test]
fn unchainable_job_never_gets_an_arc() {
    let mut j1 = job("R1", 8 * 60, 10.0);
    j1.unchainable = true;
    let j2 = job("R2", 9 * 60, 10.0);
    let edges = build_feasibility_arcs(&[j1, j2], &square_matrix(2, 0.0), &ChainConfig::default(), 5, None);
    assert!(edges.is_empty());
}

#[test]
fn three_jobs_chain_into_a_single_bus_when_all_feasible() {
    let jobs = vec![job("R1", 8 * 60, 20.0), job("R2", 8 * 60 + 30, 20.0), job("R3", 9 * 60, 20.0)];
    let matrix = square_matrix(3, 5.0);
    let (chains, diag) = build_chains_for_block(&jobs, &matrix, &ChainConfig::default(), 5, None, &ample_budget()).unwrap();
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].jobs.len(), 3);
    assert_eq!(diag.split_count, 0);
}

#[test]
fn exhausted_budget_raises_timeout() {
    let jobs = vec![job("R1", 8 * 60, 30.0)];
    let matrix = square_matrix(1, 0.0);
    let exhausted = Budget::new(Duration::ZERO);
    let err = build_chains_for_block(&jobs, &matrix, &ChainConfig::default(), 5, None, &exhausted).unwrap_err();
    assert_eq!(err, crate::error::SolverError::Timeout);
}

#[test]
fn empty_block_never_raises_timeout_even_when_exhausted() {
    let exhausted = Budget::new(Duration::ZERO);
    let (chains, _) = build_chains_for_block(&[], &[], &ChainConfig::default(), 5, None, &exhausted).unwrap();
    assert!(chains.is_empty());
}

#[test]
fn one_route_per_bus_gives_every_job_its_own_chain() {
    let jobs = vec![job("R1", 8 * 60, 20.0), job("R2", 8 * 60 + 30, 20.0)];
    let chains = one_route_per_bus(&jobs);
    assert_eq!(chains.len(), 2);
    assert!(chains.iter().all(|c| c.jobs.len() == 1));
}
