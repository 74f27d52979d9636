use super::*;

fn candidate(target_bus: Option<usize>, cost: Float, start: Float, end: Float) -> Candidate {
    Candidate { target_bus, insertion_index: 0, cost, start_min: start, end_min: end }
}

#[test]
fn prefers_lower_cost_candidate_when_no_conflicts() {
    let groups = vec![RouteCandidates {
        route_id: "R1".into(),
        candidates: vec![candidate(Some(0), 10.0, 0.0, 30.0), candidate(Some(1), 5.0, 0.0, 30.0)],
    }];
    let cfg = QuboConfig { max_iterations: 500, ..QuboConfig::default() };
    let problem = QuboProblem::build(groups, &cfg);
    let mut rng = DefaultRandom::new_with_seed(1);
    let selection = solve(&problem, &cfg, &mut rng);
    // lowest-cost real candidate (index 1, cost 5.0) should win over the
    // pricier real candidate and the synthetic new-bus candidate.
    let chosen = &problem.groups[0].candidates[selection[0]];
    assert!((chosen.cost - 5.0).abs() < 1e-6);
}

#[test]
fn avoids_overlapping_conflict_when_alternative_exists() {
    let groups = vec![
        RouteCandidates { route_id: "R1".into(), candidates: vec![candidate(Some(0), 1.0, 0.0, 30.0)] },
        RouteCandidates {
            route_id: "R2".into(),
            candidates: vec![candidate(Some(0), 1.0, 10.0, 40.0), candidate(Some(1), 1.0, 10.0, 40.0)],
        },
    ];
    let cfg = QuboConfig { max_iterations: 800, bus_conflict_penalty: 1000.0, ..QuboConfig::default() };
    let problem = QuboProblem::build(groups, &cfg);
    let mut rng = DefaultRandom::new_with_seed(3);
    let selection = solve(&problem, &cfg, &mut rng);
    let chosen = &problem.groups[1].candidates[selection[1]];
    assert_ne!(chosen.target_bus, Some(0));
}

#[test]
fn build_appends_synthetic_new_bus_candidate() {
    let groups = vec![RouteCandidates { route_id: "R1".into(), candidates: vec![candidate(Some(0), 1.0, 0.0, 10.0)] }];
    let cfg = QuboConfig::default();
    let problem = QuboProblem::build(groups, &cfg);
    assert!(problem.groups[0].candidates.iter().any(|c| c.target_bus.is_none()));
}

#[test]
fn build_trims_hot_routes_to_variable_budget() {
    let groups: Vec<_> = (0..50)
        .map(|i| RouteCandidates {
            route_id: format!("R{i}"),
            candidates: vec![candidate(Some(i), 1.0, 0.0, 10.0); 8],
        })
        .collect();
    let cfg = QuboConfig { max_variables: 20, max_hot_routes: 50, max_candidates_per_route: 8, ..QuboConfig::default() };
    let problem = QuboProblem::build(groups, &cfg);
    let total: usize = problem.groups.iter().map(|g| g.candidates.len()).sum();
    assert!(total <= 20 || problem.groups.len() == 1);
}

#[test]
fn empty_problem_yields_empty_selection() {
    let problem = QuboProblem::build(Vec::new(), &QuboConfig::default());
    let mut rng = DefaultRandom::new_with_seed(0);
    assert!(solve(&problem, &QuboConfig::default(), &mut rng).is_empty());
}
