use super::*;

#[test]
fn matches_disjoint_edges_greedily_optimal() {
    let edges = vec![
        BipartiteEdge { left: 0, right: 0, weight: 5.0 },
        BipartiteEdge { left: 1, right: 1, weight: 3.0 },
    ];
    let m = max_weight_matching(2, 2, &edges);
    assert_eq!(m.pairs, vec![(0, 0), (1, 1)]);
    assert!((m.total_weight - 8.0).abs() < 1e-6);
}

#[test]
fn prefers_higher_total_weight_over_more_matches() {
    // left0 can go to right0 (weight 10) or right1 (weight 1).
    // left1 can only go to right0 (weight 1).
    // Matching {left0-right0} beats {left0-right1, left1-right0} (10 > 2).
    let edges = vec![
        BipartiteEdge { left: 0, right: 0, weight: 10.0 },
        BipartiteEdge { left: 0, right: 1, weight: 1.0 },
        BipartiteEdge { left: 1, right: 0, weight: 1.0 },
    ];
    let m = max_weight_matching(2, 2, &edges);
    assert_eq!(m.pairs, vec![(0, 0)]);
    assert!((m.total_weight - 10.0).abs() < 1e-6);
}

#[test]
fn each_node_matched_at_most_once() {
    let edges = vec![
        BipartiteEdge { left: 0, right: 0, weight: 4.0 },
        BipartiteEdge { left: 0, right: 1, weight: 4.0 },
        BipartiteEdge { left: 1, right: 0, weight: 4.0 },
        BipartiteEdge { left: 1, right: 1, weight: 4.0 },
    ];
    let m = max_weight_matching(2, 2, &edges);
    assert_eq!(m.pairs.len(), 2);
    let lefts: std::collections::HashSet<_> = m.pairs.iter().map(|p| p.0).collect();
    let rights: std::collections::HashSet<_> = m.pairs.iter().map(|p| p.1).collect();
    assert_eq!(lefts.len(), 2);
    assert_eq!(rights.len(), 2);
}

#[test]
fn empty_edge_set_yields_empty_matching() {
    let m = max_weight_matching(3, 3, &[]);
    assert!(m.pairs.is_empty());
    assert_eq!(m.total_weight, 0.0);
}

#[test]
fn negative_weight_edge_is_never_selected() {
    let edges = vec![BipartiteEdge { left: 0, right: 0, weight: -5.0 }];
    let m = max_weight_matching(1, 1, &edges);
    assert!(m.pairs.is_empty());
}
