//! Helpers shared by the unit tests: random instances and an exhaustive reference solver.

use crate::graph::*;
use rand::Rng;

/// Creates a G(n, p) graph with integral profits in [-6, 6]
pub fn random_graph<R: Rng>(rng: &mut R, n: usize, p: f64) -> WeightedGraph {
    let profits: Vec<Weight> = (0..n).map(|_| rng.gen_range(-6..=6) as Weight).collect();
    let mut graph = WeightedGraph::from_profits_and_edges(&profits, &[]).unwrap();
    for u in 0..n as Node {
        for v in (u + 1)..n as Node {
            if rng.gen_bool(p) {
                graph.add_edge(u, v).unwrap();
            }
        }
    }
    graph
}

/// Enumerates all node subsets and returns a maximum weight connected one. Without root the
/// empty module (weight 0) is feasible; with root the module must contain it.
pub fn brute_force(graph: &WeightedGraph, root: Option<Node>) -> (Vec<Node>, Weight) {
    let nodes = graph.vertices_sorted();
    assert!(nodes.len() <= 16);

    let mut best: Option<(Vec<Node>, Weight)> = match root {
        None => Some((vec![], 0.0)),
        Some(_) => None,
    };

    for mask in 1u32..(1 << nodes.len()) {
        let subset: Vec<Node> = nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, &u)| u)
            .collect();
        if let Some(r) = root {
            if !subset.contains(&r) {
                continue;
            }
        }
        let weight = graph.weight_of(&subset);
        if best.as_ref().map_or(false, |(_, w)| *w >= weight) {
            continue;
        }
        if graph.is_connected_set(&subset).unwrap() {
            best = Some((subset, weight));
        }
    }

    best.expect("rooted instance without root")
}
