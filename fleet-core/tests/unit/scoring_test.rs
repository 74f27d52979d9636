use super::*;

#[test]
fn fewer_buses_score_lower_all_else_equal() {
    let weights = ObjectiveWeights::default();
    let one_bus = vec![ChainStats { jobs: 4, ..Default::default() }];
    let two_buses = vec![ChainStats { jobs: 2, ..Default::default() }, ChainStats { jobs: 2, ..Default::default() }];
    let score_one = weighted_score(&[], &one_bus, &weights);
    let score_two = weighted_score(&[], &two_buses, &weights);
    assert!(score_one < score_two);
}

#[test]
fn variance_penalizes_unbalanced_load() {
    let weights = ObjectiveWeights::default();
    let balanced = vec![ChainStats { jobs: 3, ..Default::default() }, ChainStats { jobs: 3, ..Default::default() }];
    let unbalanced = vec![ChainStats { jobs: 1, ..Default::default() }, ChainStats { jobs: 5, ..Default::default() }];
    let score_balanced = weighted_score(&[], &balanced, &weights);
    let score_unbalanced = weighted_score(&[], &unbalanced, &weights);
    assert!(score_balanced < score_unbalanced);
}

#[test]
fn rank_key_orders_viability_first() {
    let viable = RankKey {
        viability_penalty: 0,
        infeasible_buses: 5,
        best_buses: 10,
        load_spread_routes: 0,
        load_abs_dev_sum: 0,
        error_issues: 0,
        avg_deadhead: 0.0,
        warning_issues: 0,
        negative_avg_efficiency: 0.0,
    };
    let split_but_fewer_buses = RankKey {
        viability_penalty: 1,
        infeasible_buses: 0,
        best_buses: 1,
        load_spread_routes: 0,
        load_abs_dev_sum: 0,
        error_issues: 0,
        avg_deadhead: 0.0,
        warning_issues: 0,
        negative_avg_efficiency: 0.0,
    };
    assert!(viable.partial_cmp(&split_but_fewer_buses) == Some(std::cmp::Ordering::Less));
}
