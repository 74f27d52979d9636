use super::*;
use crate::geometry::LatLng;
use crate::model::{Block, RouteKind};

struct ConstantTravel(Float);

impl TravelLookup for ConstantTravel {
    fn minutes(&self, _from: &Job, _to: &Job) -> Float {
        self.0
    }
}

fn job(route_id: &str, anchor: Float, duration: Float, school: &str) -> Job {
    Job {
        route_id: route_id.into(),
        block: Block::MorningEntry,
        anchor_time_min: anchor,
        duration_min: duration,
        start_loc: LatLng::new(40.0, -75.0),
        end_loc: LatLng::new(40.1, -75.1),
        capacity_needed: 10,
        school_name: school.into(),
        contract_id: "C".into(),
        kind: RouteKind::Entry,
        unchainable: false,
        vehicle_capacity_min: None,
        vehicle_capacity_max: None,
        peak_stop_passengers: 0,
    }
}

fn single_chain(j: Job) -> Chain {
    Chain { jobs: vec![j], shifts: vec![TimeShift { shift_min: 0.0 }] }
}

#[test]
fn lns_never_increases_the_score_over_the_initial_candidate() {
    let chains = vec![
        single_chain(job("R1", 8 * 60, 20.0, "A")),
        single_chain(job("R2", 9 * 60, 20.0, "A")),
        single_chain(job("R3", 10 * 60, 20.0, "B")),
    ];
    let travel = ConstantTravel(5.0);
    let lns_cfg = LnsConfig { max_iterations: 30, ..LnsConfig::default() };
    let chain_cfg = ChainConfig::default();
    let weights = ObjectiveWeights::default();
    let mut rng = DefaultRandom::new_with_seed(42);
    let budget = Budget::new(std::time::Duration::from_secs(5));

    let before_score = total_score(&chains, &travel, &weights);
    let result = run_lns(chains, &travel, &lns_cfg, &chain_cfg, &weights, &mut rng, &budget);
    let after_score = total_score(&result, &travel, &weights);
    assert!(after_score <= before_score + 1e-6);
}

#[test]
fn lns_preserves_every_job() {
    let chains = vec![
        single_chain(job("R1", 8 * 60, 20.0, "A")),
        single_chain(job("R2", 9 * 60, 20.0, "A")),
    ];
    let travel = ConstantTravel(5.0);
    let lns_cfg = LnsConfig { max_iterations: 15, ..LnsConfig::default() };
    let chain_cfg = ChainConfig::default();
    let weights = ObjectiveWeights::default();
    let mut rng = DefaultRandom::new_with_seed(7);
    let budget = Budget::new(std::time::Duration::from_secs(5));

    let result = run_lns(chains, &travel, &lns_cfg, &chain_cfg, &weights, &mut rng, &budget);
    let mut ids: Vec<_> = result.iter().flat_map(|c| c.jobs.iter().map(|j| j.route_id.clone())).collect();
    ids.sort();
    assert_eq!(ids, vec!["R1".to_string(), "R2".to_string()]);
}

#[test]
fn relatedness_rewards_same_school_and_type() {
    let a = job("R1", 8 * 60, 20.0, "Lincoln");
    let b_same = job("R2", 8 * 60, 20.0, "Lincoln");
    let b_diff = job("R3", 8 * 60, 20.0, "Washington");
    let travel = ConstantTravel(0.0);
    assert!(relatedness(&a, &b_same, &travel) < relatedness(&a, &b_diff, &travel));
}

#[test]
fn zero_destroy_count_returns_empty_set() {
    let chains = vec![single_chain(job("R1", 8 * 60, 20.0, "A"))];
    let working = WorkingSet { chains };
    let travel = ConstantTravel(5.0);
    let mut rng = DefaultRandom::new_with_seed(1);
    let set = select_destroy_set(&working, 0, DestroyStrategy::Random, &travel, &mut rng);
    assert!(set.is_empty());
}
