//! Soundness-preserving reductions that shrink an MWCS instance before optimisation.
//!
//! Every rule either removes nodes/edges that no optimal module needs or merges nodes that
//! some optimal module contains either all together or not at all. Each application is logged
//! in a [`ReductionRecord`], which maps a module of the reduced graph back onto the original one.

use crate::error::{MwcsError, Result};
use crate::graph::*;
use fxhash::FxHashMap;
use log::{debug, info};

mod negative;
mod positive;

pub use negative::*;
pub use positive::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rules {
    /// Remove negative non-root nodes of degree 0 or 1
    NegDeg01,
    /// Merge the endpoints of edges whose endpoints are both non-negative
    PosEdge,
    /// Remove edges whose endpoints share a non-negative neighbour
    NegEdge,
    /// Rooted only: fold non-negative leaves into their neighbour; drop isolated nodes
    RootedPosDeg01,
    /// Remove chains of negative degree-2 nodes that only provide a redundant detour
    NegCircuit,
    /// Keep only the best of several negative degree-2 nodes with identical neighbours
    NegDiamond,
    /// Keep only the best of several negative hubs (degree >= 3) with identical neighbours
    NegMirroredHubs,
    /// Unrooted only: fold non-negative leaves into their neighbour, remembering the leaf
    /// as a fallback module
    PosDeg01,
    /// Rooted only: merge non-negative degree-2 nodes with identical neighbours
    PosDiamond,
}

impl Rules {
    /// The rule sequence used by all solvers unless configured otherwise
    pub fn default_sequence() -> Vec<Rules> {
        vec![
            Rules::NegDeg01,
            Rules::PosEdge,
            Rules::NegEdge,
            Rules::RootedPosDeg01,
            Rules::NegCircuit,
            Rules::NegDiamond,
            Rules::NegMirroredHubs,
            Rules::PosDeg01,
            Rules::PosDiamond,
        ]
    }

    /// Applies the rule exhaustively in one sweep; returns true if the graph changed
    pub fn attempt(self, state: &mut ReductionState) -> bool {
        match self {
            Rules::NegDeg01 => apply_neg_deg01(state),
            Rules::PosEdge => apply_pos_edge(state),
            Rules::NegEdge => apply_neg_edge(state),
            Rules::RootedPosDeg01 => apply_rooted_pos_deg01(state),
            Rules::NegCircuit => apply_neg_circuit(state),
            Rules::NegDiamond => apply_neg_diamond(state),
            Rules::NegMirroredHubs => apply_neg_mirrored_hubs(state),
            Rules::PosDeg01 => apply_pos_deg01(state),
            Rules::PosDiamond => apply_pos_diamond(state),
        }
    }
}

/// A module that may be optimal although the reduced graph no longer represents it;
/// created when a non-negative leaf is folded into its neighbour in the unrooted setting.
#[derive(Clone, Debug, PartialEq)]
pub struct FallbackModule {
    pub nodes: Vec<Node>,
    pub weight: Weight,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReductionEntry {
    RemovedNode {
        rule: Rules,
        node: Node,
        expansion: Vec<Node>,
    },
    RemovedEdge {
        rule: Rules,
        edge: Edge,
    },
    Merged {
        rule: Rules,
        representative: Node,
        merged: Node,
    },
}

impl ReductionEntry {
    pub fn rule(&self) -> Rules {
        match self {
            ReductionEntry::RemovedNode { rule, .. } => *rule,
            ReductionEntry::RemovedEdge { rule, .. } => *rule,
            ReductionEntry::Merged { rule, .. } => *rule,
        }
    }
}

/// Log of all rule applications plus the representative -> original node expansion.
#[derive(Clone, Debug, Default)]
pub struct ReductionRecord {
    expansion: FxHashMap<Node, Vec<Node>>,
    entries: Vec<ReductionEntry>,
    fallbacks: Vec<FallbackModule>,
}

impl ReductionRecord {
    /// Returns the original nodes represented by `u`
    pub fn expansion_of(&self, u: Node) -> Vec<Node> {
        self.expansion.get(&u).cloned().unwrap_or_else(|| vec![u])
    }

    /// Maps a module of the reduced graph onto the original nodes; the result is sorted
    pub fn expand(&self, module: &[Node]) -> Vec<Node> {
        let mut nodes: Vec<Node> = module
            .iter()
            .flat_map(|&u| self.expansion_of(u))
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    pub fn entries(&self) -> &[ReductionEntry] {
        &self.entries
    }

    pub fn fallbacks(&self) -> &[FallbackModule] {
        &self.fallbacks
    }

    /// Returns how often `rule` changed the graph
    pub fn applications_of(&self, rule: Rules) -> usize {
        self.entries.iter().filter(|e| e.rule() == rule).count()
    }

    /// Returns the heaviest fallback module (the first one on ties)
    pub fn best_fallback(&self) -> Option<&FallbackModule> {
        self.fallbacks.iter().fold(None, |best: Option<&FallbackModule>, f| match best {
            Some(b) if b.weight >= f.weight => Some(b),
            _ => Some(f),
        })
    }

    /// Expands a module of the reduced graph with the given weight and returns the better of
    /// the expansion and the best fallback module.
    pub fn finalize(&self, module: &[Node], weight: Weight) -> (Vec<Node>, Weight) {
        match self.best_fallback() {
            Some(fallback) if fallback.weight > weight => {
                (fallback.nodes.clone(), fallback.weight)
            }
            _ => (self.expand(module), weight),
        }
    }

    /// Lifts an upper bound of the reduced instance to the original instance
    pub fn finalize_bound(&self, bound: Weight) -> Weight {
        self.fallbacks
            .iter()
            .map(|f| f.weight)
            .fold(bound, Weight::max)
    }
}

/// The graph under reduction together with the optional root and the record of all changes.
/// Rules only mutate the graph via the methods below so that the record stays in sync.
pub struct ReductionState {
    graph: WeightedGraph,
    root: Option<Node>,
    record: ReductionRecord,
}

impl ReductionState {
    /// Fails if the root is not a node of `graph`
    pub fn new(graph: WeightedGraph, root: Option<Node>) -> Result<Self> {
        if let Some(r) = root {
            if !graph.has_vertex(r) {
                return Err(MwcsError::InvalidReference(r));
            }
        }
        Ok(Self {
            graph,
            root,
            record: ReductionRecord::default(),
        })
    }

    pub fn graph(&self) -> &WeightedGraph {
        &self.graph
    }

    pub fn root(&self) -> Option<Node> {
        self.root
    }

    pub fn is_root(&self, u: Node) -> bool {
        self.root == Some(u)
    }

    pub fn is_rooted(&self) -> bool {
        self.root.is_some()
    }

    pub fn record(&self) -> &ReductionRecord {
        &self.record
    }

    /// Removes `u` and everything it represents. Returns false if `u` does not exist.
    pub fn remove_node(&mut self, rule: Rules, u: Node) -> bool {
        if self.graph.remove_node(u).is_err() {
            return false;
        }
        let expansion = self.record.expansion.remove(&u).unwrap_or_else(|| vec![u]);
        self.record.entries.push(ReductionEntry::RemovedNode {
            rule,
            node: u,
            expansion,
        });
        true
    }

    pub fn remove_edge(&mut self, rule: Rules, u: Node, v: Node) -> bool {
        if !self.graph.try_remove_edge(u, v) {
            return false;
        }
        self.record.entries.push(ReductionEntry::RemovedEdge {
            rule,
            edge: normalized(u, v),
        });
        true
    }

    /// Merges `drop` into `keep`; `keep` then represents the original nodes of both
    pub fn merge(&mut self, rule: Rules, keep: Node, drop: Node) -> bool {
        debug_assert!(!self.is_root(drop));
        if self.graph.contract_into(keep, drop).is_err() {
            return false;
        }
        let mut dropped = self
            .record
            .expansion
            .remove(&drop)
            .unwrap_or_else(|| vec![drop]);
        self.record
            .expansion
            .entry(keep)
            .or_insert_with(|| vec![keep])
            .append(&mut dropped);
        self.record.entries.push(ReductionEntry::Merged {
            rule,
            representative: keep,
            merged: drop,
        });
        true
    }

    /// Remembers the module represented by `u` as a solution candidate
    pub fn add_fallback(&mut self, u: Node) {
        let mut nodes = self.record.expansion_of(u);
        nodes.sort_unstable();
        self.record.fallbacks.push(FallbackModule {
            nodes,
            weight: self.graph.profit(u),
        });
    }

    pub fn into_parts(self) -> (WeightedGraph, ReductionRecord) {
        (self.graph, self.record)
    }
}

/// Applies an ordered list of rules until none of them changes the graph (or the configured
/// number of passes is exhausted).
pub struct Reducer {
    rules: Vec<Rules>,
    max_passes: Option<usize>,
    passes: usize,
    state: ReductionState,
}

impl Reducer {
    /// creates a Reducer with the default rule sequence
    /// use .reduce() to reduce the graph
    pub fn new(graph: WeightedGraph, root: Option<Node>) -> Result<Self> {
        Self::with_settings(graph, Rules::default_sequence(), root, None)
    }

    pub fn with_settings(
        graph: WeightedGraph,
        rules: Vec<Rules>,
        root: Option<Node>,
        max_passes: Option<usize>,
    ) -> Result<Self> {
        Ok(Self {
            rules,
            max_passes,
            passes: 0,
            state: ReductionState::new(graph, root)?,
        })
    }

    /// Runs all rules in order, repeatedly, until a full pass changes nothing.
    /// Each application strictly decreases the number of nodes plus edges, so this terminates.
    pub fn reduce(&mut self) -> &ReductionState {
        let n0 = self.state.graph.number_of_nodes();
        let m0 = self.state.graph.number_of_edges();

        loop {
            if self.max_passes.map_or(false, |max| self.passes >= max) {
                break;
            }

            let mut applied_rule = false;
            for &rule in &self.rules {
                let applied = rule.attempt(&mut self.state);
                if applied {
                    debug!(
                        "Pass {} rule {:?}: n={} m={}",
                        self.passes,
                        rule,
                        self.state.graph.number_of_nodes(),
                        self.state.graph.number_of_edges()
                    );
                }
                applied_rule |= applied;
            }
            self.passes += 1;

            if !applied_rule {
                break;
            }
        }

        info!(
            "Reduction: n {} -> {}, m {} -> {} in {} passes; {} fallback modules",
            n0,
            self.state.graph.number_of_nodes(),
            m0,
            self.state.graph.number_of_edges(),
            self.passes,
            self.state.record.fallbacks.len()
        );

        &self.state
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn state(&self) -> &ReductionState {
        &self.state
    }

    pub fn into_parts(self) -> (WeightedGraph, ReductionRecord) {
        self.state.into_parts()
    }
}

/// Reduces `graph` with the default rules; `max_passes` limits the number of passes.
pub fn reduce_graph(
    graph: WeightedGraph,
    root: Option<Node>,
    max_passes: Option<usize>,
) -> Result<(WeightedGraph, ReductionRecord)> {
    let mut reducer = Reducer::with_settings(graph, Rules::default_sequence(), root, max_passes)?;
    reducer.reduce();
    Ok(reducer.into_parts())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::weighted_graph::tests::path_graph;
    use crate::testing::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;

    #[test]
    fn path_unrooted() {
        let (reduced, record) = reduce_graph(path_graph(), None, None).unwrap();
        assert!(reduced.is_empty());
        let (module, weight) = record.finalize(&[], 0.0);
        assert_eq!(module, vec![0, 1, 2]);
        assert_eq!(weight, 6.0);
        assert_eq!(record.applications_of(Rules::NegDeg01), 1);
        assert_eq!(record.finalize_bound(0.0), 6.0);
    }

    #[test]
    fn path_rooted() {
        let (reduced, record) = reduce_graph(path_graph(), Some(3), None).unwrap();
        assert_eq!(reduced.vertices_sorted(), vec![3]);
        assert_eq!(reduced.profit(3), -4.0);
        assert!(record.fallbacks().is_empty());
        assert_eq!(record.expand(&[3]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn invalid_root() {
        assert!(matches!(
            Reducer::new(path_graph(), Some(17)),
            Err(MwcsError::InvalidReference(17))
        ));
    }

    #[test]
    fn pass_limit() {
        let mut reducer =
            Reducer::with_settings(path_graph(), Rules::default_sequence(), None, Some(0)).unwrap();
        reducer.reduce();
        assert_eq!(reducer.passes(), 0);
        assert_eq!(reducer.state().graph().number_of_nodes(), 4);
    }

    #[test]
    fn soundness_unrooted() {
        let mut rng = Pcg64::seed_from_u64(1234);
        for _ in 0..300 {
            let n = rng.gen_range(1..=9);
            let graph = random_graph(&mut rng, n, 0.35);
            let (opt_module, opt) = brute_force(&graph, None);

            let (reduced, record) = reduce_graph(graph.clone(), None, None).unwrap();
            let (red_module, red_weight) = brute_force(&reduced, None);
            let (module, weight) = record.finalize(&red_module, red_weight);

            assert!((weight - opt).abs() < 1e-7, "{:?}: {} vs {}", graph, weight, opt);
            assert!((graph.weight_of(&module) - weight).abs() < 1e-7);
            assert!(graph.is_connected_set(&module).unwrap());
            assert!(graph.is_connected_set(&opt_module).unwrap());
        }
    }

    #[test]
    fn soundness_rooted() {
        let mut rng = Pcg64::seed_from_u64(4321);
        for _ in 0..300 {
            let n = rng.gen_range(1..=9);
            let graph = random_graph(&mut rng, n, 0.35);
            let root = rng.gen_range(0..n) as Node;
            let (_, opt) = brute_force(&graph, Some(root));

            let (reduced, record) = reduce_graph(graph.clone(), Some(root), None).unwrap();
            assert!(reduced.has_vertex(root));
            let (red_module, red_weight) = brute_force(&reduced, Some(root));
            let (module, weight) = record.finalize(&red_module, red_weight);

            assert!((weight - opt).abs() < 1e-7, "{:?}: {} vs {}", graph, weight, opt);
            assert!(module.contains(&root));
            assert!((graph.weight_of(&module) - weight).abs() < 1e-7);
            assert!(graph.is_connected_set(&module).unwrap());
        }
    }

    #[test]
    fn idempotence() {
        let mut rng = Pcg64::seed_from_u64(99);
        for _ in 0..100 {
            let n = rng.gen_range(1..=12);
            let graph = random_graph(&mut rng, n, 0.3);
            let root = if rng.gen_bool(0.5) {
                Some(rng.gen_range(0..n) as Node)
            } else {
                None
            };
            let (reduced, _) = reduce_graph(graph, root, None).unwrap();
            let mut second = Reducer::new(reduced.clone(), root).unwrap();
            second.reduce();
            assert_eq!(second.passes(), 1);
            assert!(second.state().record().entries().is_empty());
            assert_eq!(
                second.state().graph().number_of_nodes(),
                reduced.number_of_nodes()
            );
        }
    }

    #[test]
    fn weight_is_conserved() {
        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..100 {
            let n = rng.gen_range(1..=12);
            let graph = random_graph(&mut rng, n, 0.3);
            let (reduced, record) = reduce_graph(graph.clone(), None, None).unwrap();
            for u in reduced.vertices() {
                let expansion = record.expansion_of(u);
                assert!((graph.weight_of(&expansion) - reduced.profit(u)).abs() < 1e-7);
                assert!(graph.is_connected_set(&expansion).unwrap());
            }
        }
    }
}
