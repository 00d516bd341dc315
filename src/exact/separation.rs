//! Generation of connectivity inequalities for the node-selection formulation.
//!
//! Variables are indexed by node id, so the separator expects a graph with the dense ids
//! `0..n` that the cut solver builds.

use super::engine::{LinearCut, VarIndex};
use crate::graph::*;
use itertools::Itertools;
use log::trace;

/// Values above this threshold count as selected in integral points
const SUPPORT_THRESHOLD: f64 = 0.5;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeparationStats {
    pub fractional_rounds: usize,
    pub integral_rounds: usize,
    pub flow_computations: usize,
    pub cuts: usize,
}

pub struct ConnectivitySeparator<'a> {
    graph: &'a WeightedGraph,
    root: Node,
    max_cuts: usize,
    tolerance: f64,
    stats: SeparationStats,
}

/// The inequality `x_v <= sum_{w in separator} x_w`
fn separator_cut(v: Node, separator: &[Node]) -> LinearCut {
    let coefficients = std::iter::once((v as VarIndex, 1.0))
        .chain(separator.iter().map(|&w| (w as VarIndex, -1.0)))
        .collect();
    LinearCut::new(coefficients, 0.0)
}

impl<'a> ConnectivitySeparator<'a> {
    pub fn new(graph: &'a WeightedGraph, root: Node, max_cuts: usize) -> Self {
        Self {
            graph,
            root,
            max_cuts: max_cuts.max(1),
            tolerance: 1e-6,
            stats: SeparationStats::default(),
        }
    }

    pub fn stats(&self) -> &SeparationStats {
        &self.stats
    }

    /// Searches for nodes `v` whose LP value exceeds the value of a minimum r-v vertex
    /// separator (capacities are the LP values) and returns one cut per such node, for at most
    /// `max_cuts` nodes. Nodes with large values are tried first.
    pub fn separate_fractional(&mut self, x: &[f64]) -> Vec<LinearCut> {
        self.stats.fractional_rounds += 1;

        let candidates = self
            .graph
            .vertices()
            .filter(|&v| v != self.root && x[v as usize] > self.tolerance)
            .filter(|&v| !self.graph.has_edge(self.root, v))
            .sorted_by(|&a, &b| {
                x[b as usize]
                    .partial_cmp(&x[a as usize])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            })
            .collect_vec();

        let mut cuts = Vec::new();
        for v in candidates {
            if cuts.len() >= self.max_cuts {
                break;
            }
            let xv = x[v as usize];
            self.stats.flow_computations += 1;
            let separator = self.graph.min_st_vertex_separator(
                self.root,
                v,
                |w| x[w as usize],
                Some(xv - self.tolerance),
            );
            if let Some(separator) = separator {
                trace!(
                    "violated separator for node {}: {:.4} < {:.4}",
                    v,
                    separator.value,
                    xv
                );
                cuts.push(separator_cut(v, &separator.nodes));
            }
        }

        self.stats.cuts += cuts.len();
        cuts
    }

    /// For an integral point returns one cut per connected component of the selected nodes
    /// that misses the root: a node of the component must be dropped or a node of the
    /// component's neighbourhood must be added. Returns no cuts iff the selection is connected.
    pub fn separate_integral(&mut self, x: &[f64]) -> Vec<LinearCut> {
        self.stats.integral_rounds += 1;

        let support = self
            .graph
            .vertices_sorted()
            .into_iter()
            .filter(|&u| x[u as usize] > SUPPORT_THRESHOLD)
            .collect_vec();

        let cuts = self
            .graph
            .components_within(&support)
            .into_iter()
            .filter(|component| !component.contains(&self.root))
            .map(|component| {
                let boundary = component
                    .iter()
                    .flat_map(|&u| self.graph.neighbors(u))
                    .filter(|w| component.binary_search(w).is_err())
                    .sorted()
                    .dedup()
                    .collect_vec();
                separator_cut(component[0], &boundary)
            })
            .collect_vec();

        self.stats.cuts += cuts.len();
        cuts
    }
}
