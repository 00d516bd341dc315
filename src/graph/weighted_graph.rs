use super::*;
use crate::error::MwcsError;
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use std::fmt;

/// Undirected graph with node profits, optional node labels and optional edge weights.
///
/// Node ids are stable: removing a node never renames another one, and ids of removed nodes are
/// not reused by [`WeightedGraph::add_labeled_node`]. Parallel edges are collapsed into one edge
/// that keeps the maximum weight of the pair; self-loops are rejected.
#[derive(Clone, Default)]
pub struct WeightedGraph {
    adj: FxHashMap<Node, FxHashSet<Node>>,
    profits: FxHashMap<Node, Weight>,
    labels: FxHashMap<Node, String>,
    label_index: FxHashMap<String, Node>,
    edge_weights: FxHashMap<Edge, Weight>,
    m: usize,
    next_id: Node,
}

impl GraphOrder for WeightedGraph {
    fn number_of_nodes(&self) -> Node {
        self.adj.len() as Node
    }

    fn number_of_edges(&self) -> usize {
        self.m
    }

    fn vertices(&self) -> impl Iterator<Item = Node> + '_ {
        self.adj.keys().copied()
    }
}

impl AdjacencyList for WeightedGraph {
    fn neighbors(&self, u: Node) -> impl Iterator<Item = Node> + '_ {
        self.adj[&u].iter().copied()
    }

    fn degree(&self, u: Node) -> Node {
        self.adj[&u].len() as Node
    }
}

impl AdjacencyTest for WeightedGraph {
    fn has_vertex(&self, u: Node) -> bool {
        self.adj.contains_key(&u)
    }

    fn has_edge(&self, u: Node, v: Node) -> bool {
        self.adj.get(&u).map_or(false, |nb| nb.contains(&v))
    }
}

impl NodeWeights for WeightedGraph {
    fn profit(&self, u: Node) -> Weight {
        self.profits[&u]
    }
}

impl GraphEdgeEditing for WeightedGraph {
    fn add_edge(&mut self, u: Node, v: Node) -> Result<()> {
        self.check_edge(u, v)?;
        self.try_add_edge(u, v);
        Ok(())
    }

    fn try_add_edge(&mut self, u: Node, v: Node) -> bool {
        if u == v || !self.has_vertex(u) || !self.has_vertex(v) {
            return false;
        }
        if !self.adj.get_mut(&u).unwrap().insert(v) {
            return false;
        }
        self.adj.get_mut(&v).unwrap().insert(u);
        self.m += 1;
        true
    }

    fn remove_edge(&mut self, u: Node, v: Node) -> Result<()> {
        if !self.has_vertex(u) {
            return Err(MwcsError::InvalidReference(u));
        }
        if !self.has_vertex(v) {
            return Err(MwcsError::InvalidReference(v));
        }
        if !self.try_remove_edge(u, v) {
            return Err(MwcsError::InvalidReference(v));
        }
        Ok(())
    }

    fn try_remove_edge(&mut self, u: Node, v: Node) -> bool {
        if !self.has_edge(u, v) {
            return false;
        }
        self.adj.get_mut(&u).unwrap().remove(&v);
        self.adj.get_mut(&v).unwrap().remove(&u);
        self.edge_weights.remove(&normalized(u, v));
        self.m -= 1;
        true
    }
}

impl GraphVertexEditing for WeightedGraph {
    fn add_node(&mut self, u: Node, profit: Weight) -> Result<()> {
        if self.has_vertex(u) {
            return Err(MwcsError::DuplicateNode(u.to_string()));
        }
        self.adj.insert(u, FxHashSet::default());
        self.profits.insert(u, profit);
        self.next_id = self.next_id.max(u + 1);
        Ok(())
    }

    fn remove_node(&mut self, u: Node) -> Result<Vec<Node>> {
        let neighbors = self.adj.remove(&u).ok_or(MwcsError::InvalidReference(u))?;
        for &v in &neighbors {
            self.adj.get_mut(&v).unwrap().remove(&u);
            self.edge_weights.remove(&normalized(u, v));
        }
        self.m -= neighbors.len();
        self.profits.remove(&u);
        if let Some(label) = self.labels.remove(&u) {
            self.label_index.remove(&label);
        }
        Ok(neighbors.into_iter().collect())
    }

    fn set_profit(&mut self, u: Node, profit: Weight) -> Result<()> {
        let entry = self
            .profits
            .get_mut(&u)
            .ok_or(MwcsError::InvalidReference(u))?;
        *entry = profit;
        Ok(())
    }
}

impl WeightedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph with nodes `0..profits.len()` carrying the given profits and the given
    /// edges.
    ///
    /// # Example
    /// ```
    /// use mwcs::graph::*;
    /// let graph = WeightedGraph::from_profits_and_edges(&[5.0, -2.0, 3.0], &[(0, 1), (1, 2)]).unwrap();
    /// assert_eq!(graph.number_of_nodes(), 3);
    /// assert_eq!(graph.number_of_edges(), 2);
    /// assert_eq!(graph.profit(1), -2.0);
    /// ```
    pub fn from_profits_and_edges(profits: &[Weight], edges: &[Edge]) -> Result<Self> {
        let mut graph = Self::new();
        for (u, &p) in profits.iter().enumerate() {
            graph.add_node(u as Node, p)?;
        }
        for &(u, v) in edges {
            graph.add_edge(u, v)?;
        }
        Ok(graph)
    }

    /// Adds a fresh node carrying `label` and returns its id.
    /// Fails with [`MwcsError::DuplicateNode`] if the label is already in use.
    pub fn add_labeled_node(&mut self, label: &str, profit: Weight) -> Result<Node> {
        if self.label_index.contains_key(label) {
            return Err(MwcsError::DuplicateNode(label.to_string()));
        }
        let u = self.next_id;
        self.add_node(u, profit)?;
        self.labels.insert(u, label.to_string());
        self.label_index.insert(label.to_string(), u);
        Ok(u)
    }

    /// Adds a node with an id that was never used before and returns the id
    pub fn add_fresh_node(&mut self, profit: Weight) -> Node {
        let u = self.next_id;
        self.adj.insert(u, FxHashSet::default());
        self.profits.insert(u, profit);
        self.next_id += 1;
        u
    }

    /// Adds the edge {u, v} with weight `w`. If the edge already exists, it keeps the larger
    /// of both weights.
    pub fn add_weighted_edge(&mut self, u: Node, v: Node, w: Weight) -> Result<()> {
        self.check_edge(u, v)?;
        self.try_add_edge(u, v);
        let entry = self.edge_weights.entry(normalized(u, v)).or_insert(w);
        if w > *entry {
            *entry = w;
        }
        Ok(())
    }

    fn check_edge(&self, u: Node, v: Node) -> Result<()> {
        if !self.has_vertex(u) {
            return Err(MwcsError::InvalidReference(u));
        }
        if !self.has_vertex(v) {
            return Err(MwcsError::InvalidReference(v));
        }
        if u == v {
            return Err(MwcsError::SelfLoop(u));
        }
        Ok(())
    }

    /// Returns the weight of edge {u, v} if the edge exists and carries a weight
    pub fn edge_weight(&self, u: Node, v: Node) -> Option<Weight> {
        self.edge_weights.get(&normalized(u, v)).copied()
    }

    /// Returns the number of edges that carry a weight
    pub fn number_of_weighted_edges(&self) -> usize {
        self.edge_weights.len()
    }

    pub fn label(&self, u: Node) -> Option<&str> {
        self.labels.get(&u).map(|s| s.as_str())
    }

    /// Returns the label of *u* or its id if it has none
    pub fn display_label(&self, u: Node) -> String {
        self.label(u).map_or_else(|| u.to_string(), |s| s.to_string())
    }

    pub fn node_by_label(&self, label: &str) -> Option<Node> {
        self.label_index.get(label).copied()
    }

    /// Sum of all positive node profits; a trivial upper bound on the weight of any module
    pub fn total_positive_profit(&self) -> Weight {
        self.profits.values().filter(|&&p| p > 0.0).sum()
    }

    /// Merges `drop` into `keep`: `keep` receives the summed profit and all neighbours of `drop`,
    /// then `drop` is removed. Edge weights of parallel edges collapse to their maximum.
    pub fn contract_into(&mut self, keep: Node, drop: Node) -> Result<()> {
        self.check_edge(keep, drop)?;
        let profit = self.profits[&keep] + self.profits[&drop];
        let neighbors = self.neighbors_sorted(drop);
        for v in neighbors {
            if v == keep {
                continue;
            }
            match self.edge_weight(drop, v) {
                Some(w) => self.add_weighted_edge(keep, v, w)?,
                None => self.add_edge(keep, v)?,
            }
        }
        self.remove_node(drop)?;
        self.set_profit(keep, profit)
    }

    /// Returns the subgraph induced by `nodes`; ids, profits, labels and edge weights are kept.
    /// Fails if a node does not exist.
    pub fn induced_subgraph(&self, nodes: &[Node]) -> Result<WeightedGraph> {
        let mut sub = WeightedGraph::new();
        for &u in nodes {
            if !self.has_vertex(u) {
                return Err(MwcsError::InvalidReference(u));
            }
            if sub.has_vertex(u) {
                continue;
            }
            sub.add_node(u, self.profit(u))?;
            if let Some(label) = self.labels.get(&u) {
                sub.labels.insert(u, label.clone());
                sub.label_index.insert(label.clone(), u);
            }
        }
        sub.next_id = sub.next_id.max(self.next_id);

        for u in nodes.iter().copied().unique() {
            let inner = self
                .neighbors(u)
                .filter(|&v| u < v && sub.has_vertex(v))
                .collect_vec();
            for v in inner {
                sub.try_add_edge(u, v);
                if let Some(w) = self.edge_weight(u, v) {
                    sub.edge_weights.insert(normalized(u, v), w);
                }
            }
        }
        Ok(sub)
    }

    /// Returns a copy without the given nodes; unknown ids are ignored
    pub fn without_nodes(&self, nodes: &[Node]) -> WeightedGraph {
        let mut copy = self.clone();
        for &u in nodes {
            let _ = copy.remove_node(u);
        }
        copy
    }

    /// Replaces every weighted edge {u, v} by a path u - e - v where the new node e carries the
    /// edge weight as its profit. Unweighted edges are kept. Returns the transformed graph
    /// together with a map from the new edge nodes to the edges they represent.
    ///
    /// # Example
    /// ```
    /// use mwcs::graph::*;
    /// let mut graph = WeightedGraph::from_profits_and_edges(&[1.0, 1.0], &[]).unwrap();
    /// graph.add_weighted_edge(0, 1, -0.5).unwrap();
    /// let (sub, edge_nodes) = graph.subdivide_weighted_edges();
    /// assert_eq!(sub.number_of_nodes(), 3);
    /// assert_eq!(edge_nodes.len(), 1);
    /// assert!(!sub.has_edge(0, 1));
    /// ```
    pub fn subdivide_weighted_edges(&self) -> (WeightedGraph, FxHashMap<Node, Edge>) {
        let mut result = self.clone();
        let mut edge_nodes = FxHashMap::default();

        let weighted: Vec<(Edge, Weight)> = self
            .edge_weights
            .iter()
            .map(|(&e, &w)| (e, w))
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .collect();

        for ((u, v), w) in weighted {
            result.try_remove_edge(u, v);
            let e = result.add_fresh_node(w);
            result.try_add_edge(u, e);
            result.try_add_edge(e, v);
            edge_nodes.insert(e, (u, v));
        }

        (result, edge_nodes)
    }

    /// Subdivides the weighted edges as [`WeightedGraph::subdivide_weighted_edges`] does, but
    /// only if every edge weight is a cost (at most zero). A positive edge node could be
    /// selected with a single endpoint, so such weights fail with [`MwcsError::Config`].
    pub fn subdivide_edge_costs(&self) -> Result<(WeightedGraph, FxHashMap<Node, Edge>)> {
        let positive = self
            .edge_weights
            .iter()
            .filter(|&(_, &w)| w > 0.0)
            .min_by_key(|&(&e, _)| e);
        if let Some((&(u, v), &w)) = positive {
            return Err(MwcsError::Config(format!(
                "edge {} - {} has positive weight {}; edge weights must be costs (at most 0)",
                self.display_label(u),
                self.display_label(v),
                w
            )));
        }
        Ok(self.subdivide_weighted_edges())
    }

    /// Maps a module of this subdivided graph back to the nodes of the graph it was built from.
    /// Edge nodes with both endpoints in `module` count towards the returned weight; the others
    /// are leaves of the module and are dropped.
    pub fn project_subdivided_module(
        &self,
        edge_nodes: &FxHashMap<Node, Edge>,
        module: &[Node],
    ) -> (Vec<Node>, Weight) {
        let members: FxHashSet<Node> = module.iter().copied().collect();
        let mut nodes = Vec::new();
        let mut weight = 0.0;
        for u in module.iter().copied().sorted().dedup() {
            match edge_nodes.get(&u) {
                Some((a, b)) if members.contains(a) && members.contains(b) => {
                    weight += self.profit(u);
                }
                Some(_) => {}
                None => {
                    weight += self.profit(u);
                    nodes.push(u);
                }
            }
        }
        (nodes, weight)
    }
}

impl fmt::Debug for WeightedGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self
            .vertices_sorted()
            .into_iter()
            .map(|u| format!("{}:{}", u, self.profit(u)))
            .join(", ");
        let edges = self
            .edges_sorted()
            .into_iter()
            .map(|(u, v)| format!("{}-{}", u, v))
            .join(", ");
        write!(f, "WeightedGraph {{ nodes: [{}], edges: [{}] }}", nodes, edges)
    }
}
