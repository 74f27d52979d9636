//! Exact maximum-weight bipartite matching via successive shortest
//! augmenting paths over a min-cost max-flow network.
//!
//! Both the chain builder's minimum path cover and the
//! cross-block merger reduce to this same primitive: the
//! bipartite matching polytope is integral, so an exact combinatorial
//! solver gives the same optimum an ILP formulation would, without
//! depending on an external MIP solver.

/// One candidate pairing between a left node and a right node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BipartiteEdge {
    pub left: usize,
    pub right: usize,
    pub weight: f64,
}

/// The result of solving a bipartite matching instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Matching {
    /// `pairs[k] = (left, right)` for each matched edge, in the order
    /// found. Unmatched nodes simply do not appear.
    pub pairs: Vec<(usize, usize)>,
    pub total_weight: f64,
}

const INF: f64 = f64::INFINITY;

/// Solves maximum-weight bipartite matching over `n_left` left nodes and
/// `n_right` right nodes connected by `edges`. Each node is matched at
/// most once. Ties among equal-weight augmenting paths are broken by
/// edge order, so results are deterministic for a fixed edge ordering —
/// callers wanting lexicographic tie-breaks should sort
/// `edges` accordingly before calling.
pub fn max_weight_matching(n_left: usize, n_right: usize, edges: &[BipartiteEdge]) -> Matching {
    // Network: source (0) -> left nodes (1..=n_left) -> right nodes
    // (n_left+1..=n_left+n_right) -> sink (n_left+n_right+1). Cost is
    // negated weight so that "min cost" flow equals "max weight" matching;
    // we only augment along paths with strictly negative cost so an empty
    // matching is never made worse by accepting negative-weight edges.
    let source = 0usize;
    let sink = n_left + n_right + 1;
    let n_nodes = n_left + n_right + 2;

    let mut graph = FlowGraph::new(n_nodes);
    for l in 0..n_left {
        graph.add_edge(source, 1 + l, 1, 0.0);
    }
    for r in 0..n_right {
        graph.add_edge(1 + n_left + r, sink, 1, 0.0);
    }
    let mut edge_id_for_pair = std::collections::HashMap::new();
    for (idx, e) in edges.iter().enumerate() {
        let from = 1 + e.left;
        let to = 1 + n_left + e.right;
        let eid = graph.add_edge(from, to, 1, -e.weight);
        edge_id_for_pair.insert(eid, (e.left, e.right));
    }

    let mut total_weight = 0.0;
    loop {
        match graph.shortest_path(source, sink) {
            Some((cost, path_edges)) if cost < -1e-9 => {
                graph.augment(&path_edges, 1);
                total_weight -= cost;
            }
            _ => break,
        }
    }

    let mut pairs = Vec::new();
    for (&eid, &(l, r)) in &edge_id_for_pair {
        if graph.flow_on(eid) > 0 {
            pairs.push((l, r));
        }
    }
    pairs.sort_unstable();
    Matching { pairs, total_weight }
}

/// Minimal min-cost-flow network supporting successive shortest augmenting
/// paths via Bellman-Ford (edge costs may be negative, but the network as
/// constructed here never contains a negative cycle).
struct FlowGraph {
    adj: Vec<Vec<usize>>,
    to: Vec<usize>,
    cap: Vec<i64>,
    cost: Vec<f64>,
}

impl FlowGraph {
    fn new(n_nodes: usize) -> Self {
        Self { adj: vec![Vec::new(); n_nodes], to: Vec::new(), cap: Vec::new(), cost: Vec::new() }
    }

    /// Adds a forward edge with its paired reverse edge; returns the
    /// forward edge's id.
    fn add_edge(&mut self, from: usize, to: usize, cap: i64, cost: f64) -> usize {
        let fwd = self.to.len();
        self.to.push(to);
        self.cap.push(cap);
        self.cost.push(cost);
        self.adj[from].push(fwd);

        let rev = self.to.len();
        self.to.push(from);
        self.cap.push(0);
        self.cost.push(-cost);
        self.adj[to].push(rev);

        fwd
    }

    fn flow_on(&self, eid: usize) -> i64 {
        // original capacity minus remaining capacity; we never set
        // original caps above 1 for matching edges, so remaining 0 means
        // saturated.
        1 - self.cap[eid]
    }

    /// Bellman-Ford shortest path by cost over edges with remaining
    /// capacity; returns `(total_cost, edge_ids_on_path)`.
    fn shortest_path(&self, source: usize, sink: usize) -> Option<(f64, Vec<usize>)> {
        let n = self.adj.len();
        let mut dist = vec![INF; n];
        let mut incoming_edge = vec![usize::MAX; n];
        dist[source] = 0.0;

        for _ in 0..n {
            let mut updated = false;
            for u in 0..n {
                if dist[u] == INF {
                    continue;
                }
                for &eid in &self.adj[u] {
                    if self.cap[eid] <= 0 {
                        continue;
                    }
                    let v = self.to[eid];
                    let nd = dist[u] + self.cost[eid];
                    if nd < dist[v] - 1e-12 {
                        dist[v] = nd;
                        incoming_edge[v] = eid;
                        updated = true;
                    }
                }
            }
            if !updated {
                break;
            }
        }

        if dist[sink] == INF {
            return None;
        }

        let mut path = Vec::new();
        let mut v = sink;
        while v != source {
            let eid = incoming_edge[v];
            if eid == usize::MAX {
                return None;
            }
            path.push(eid);
            v = reverse_source(self, eid);
        }
        path.reverse();
        Some((dist[sink], path))
    }

    fn augment(&mut self, path_edges: &[usize], amount: i64) {
        for &eid in path_edges {
            self.cap[eid] -= amount;
            self.cap[eid ^ 1] += amount;
        }
    }
}

fn reverse_source(graph: &FlowGraph, eid: usize) -> usize {
    graph.to[eid ^ 1]
}

#[cfg(test)]
#[path = "../tests/unit/matching_test.rs"]
mod matching_test;
