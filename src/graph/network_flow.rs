use super::*;
use fxhash::FxHashMap;
use std::collections::VecDeque;

/// Capacity used for arcs that must never be part of a minimum cut
pub const INFINITE_CAPACITY: f64 = 1e9;

const FLOW_EPS: f64 = 1e-9;

/// Residual network with real capacities stored as paired arcs: arc `i` and arc `i ^ 1`
/// are mutual reverses.
#[derive(Clone, Debug)]
pub struct ResidualNetwork {
    s: usize,
    t: usize,
    head: Vec<usize>,
    residual: Vec<f64>,
    out_arcs: Vec<Vec<usize>>,
}

impl ResidualNetwork {
    pub fn new(n: usize, s: usize, t: usize) -> Self {
        Self {
            s,
            t,
            head: Vec::new(),
            residual: Vec::new(),
            out_arcs: vec![Vec::new(); n],
        }
    }

    pub fn len(&self) -> usize {
        self.out_arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out_arcs.is_empty()
    }

    /// Adds the arc (u, v) with capacity `cap` together with its reverse arc of capacity 0
    pub fn add_arc(&mut self, u: usize, v: usize, cap: f64) {
        self.out_arcs[u].push(self.head.len());
        self.head.push(v);
        self.residual.push(cap);
        self.out_arcs[v].push(self.head.len());
        self.head.push(u);
        self.residual.push(0.0);
    }

    /// Adds the edge {u, v} with capacity `cap` in both directions
    pub fn add_undirected(&mut self, u: usize, v: usize, cap: f64) {
        self.out_arcs[u].push(self.head.len());
        self.head.push(v);
        self.residual.push(cap);
        self.out_arcs[v].push(self.head.len());
        self.head.push(u);
        self.residual.push(cap);
    }

    pub fn source(&self) -> usize {
        self.s
    }

    pub fn target(&self) -> usize {
        self.t
    }

    /// Returns a flag per vertex stating whether it can be reached from the source in the
    /// residual network
    pub fn reachable_from_source(&self) -> Vec<bool> {
        let mut visited = vec![false; self.len()];
        visited[self.s] = true;
        let mut queue = VecDeque::from(vec![self.s]);
        while let Some(u) = queue.pop_front() {
            for &a in &self.out_arcs[u] {
                let v = self.head[a];
                if self.residual[a] > FLOW_EPS && !visited[v] {
                    visited[v] = true;
                    queue.push_back(v);
                }
            }
        }
        visited
    }
}

pub struct EdmondsKarp {
    residual_network: ResidualNetwork,
    predecessor: Vec<Option<usize>>,
    flow: f64,
}

impl EdmondsKarp {
    pub fn new(residual_network: ResidualNetwork) -> Self {
        let n = residual_network.len();
        Self {
            residual_network,
            predecessor: vec![None; n],
            flow: 0.0,
        }
    }

    fn bfs(&mut self) -> bool {
        let s = self.residual_network.s;
        let t = self.residual_network.t;
        self.predecessor.iter_mut().for_each(|p| *p = None);

        let mut visited = vec![false; self.residual_network.len()];
        visited[s] = true;
        let mut queue = VecDeque::from(vec![s]);
        while let Some(u) = queue.pop_front() {
            for &a in &self.residual_network.out_arcs[u] {
                let v = self.residual_network.head[a];
                if visited[v] || self.residual_network.residual[a] <= FLOW_EPS {
                    continue;
                }
                visited[v] = true;
                self.predecessor[v] = Some(a);
                if v == t {
                    return true;
                }
                queue.push_back(v);
            }
        }
        false
    }

    /// Pushes flow along one shortest augmenting path; returns the amount pushed
    /// or None if the target is no longer reachable.
    fn augment(&mut self) -> Option<f64> {
        if !self.bfs() {
            return None;
        }

        let s = self.residual_network.s;
        let mut bottleneck = f64::INFINITY;
        let mut v = self.residual_network.t;
        while v != s {
            let a = self.predecessor[v]?;
            bottleneck = bottleneck.min(self.residual_network.residual[a]);
            v = self.residual_network.head[a ^ 1];
        }

        let mut v = self.residual_network.t;
        while v != s {
            let a = self.predecessor[v]?;
            self.residual_network.residual[a] -= bottleneck;
            self.residual_network.residual[a ^ 1] += bottleneck;
            v = self.residual_network.head[a ^ 1];
        }

        self.flow += bottleneck;
        Some(bottleneck)
    }

    /// Computes the maximum flow value from s to t
    pub fn max_flow(&mut self) -> f64 {
        while self.augment().is_some() {}
        self.flow
    }

    /// Computes the flow value but stops augmenting as soon as it reaches `limit`.
    /// The returned value is exact if it is below `limit`.
    pub fn max_flow_upto(&mut self, limit: f64) -> f64 {
        while self.flow < limit {
            if self.augment().is_none() {
                break;
            }
        }
        self.flow
    }

    pub fn residual_network(&self) -> &ResidualNetwork {
        &self.residual_network
    }
}

/// Result of a minimum weight (s, t) vertex separator computation
#[derive(Clone, Debug, PartialEq)]
pub struct VertexSeparator {
    /// Total capacity of the separator (equals the max flow value)
    pub value: f64,
    /// Nodes whose removal disconnects s from t
    pub nodes: Vec<Node>,
}

pub trait MinVertexCut: AdjacencyList + AdjacencyTest {
    /// Computes a minimum weight (s, t) vertex separator where node `v` costs `capacity(v)`.
    /// s and t themselves are never part of the separator. Returns `None` if s and t are
    /// adjacent, i.e. no separator exists, or if the flow reaches `limit` (in which case no
    /// separator cheaper than `limit` exists).
    ///
    /// The network splits every node v into v_in = 2i and v_out = 2i + 1 joined by an arc of
    /// capacity `capacity(v)`; every edge {u, v} becomes u_out -> v_in and v_out -> u_in with
    /// infinite capacity. The flow runs from s_out to t_in.
    ///
    /// # Example
    /// ```
    /// use mwcs::graph::*;
    /// //      / 1 \
    /// // (s) 0     3 (t)
    /// //      \ 2 /
    /// let graph = WeightedGraph::from_profits_and_edges(&[0.0; 4], &[(0, 1), (0, 2), (1, 3), (2, 3)]).unwrap();
    /// let cut = graph.min_st_vertex_separator(0, 3, |v| if v == 1 { 0.25 } else { 1.0 }, None).unwrap();
    /// assert_eq!(cut.nodes, vec![1, 2]);
    /// assert!((cut.value - 1.25).abs() < 1e-9);
    /// ```
    fn min_st_vertex_separator<C: Fn(Node) -> f64>(
        &self,
        s: Node,
        t: Node,
        capacity: C,
        limit: Option<f64>,
    ) -> Option<VertexSeparator> {
        if s == t || self.has_edge(s, t) || !self.has_vertex(s) || !self.has_vertex(t) {
            return None;
        }

        let nodes = self.vertices_sorted();
        let index: FxHashMap<Node, usize> =
            nodes.iter().enumerate().map(|(i, &u)| (u, i)).collect();
        let v_in = |u: Node| 2 * index[&u];
        let v_out = |u: Node| 2 * index[&u] + 1;

        let mut network = ResidualNetwork::new(2 * nodes.len(), v_out(s), v_in(t));
        for &u in &nodes {
            let cap = if u == s || u == t {
                INFINITE_CAPACITY
            } else {
                capacity(u).max(0.0)
            };
            network.add_arc(v_in(u), v_out(u), cap);
            for v in self.neighbors(u) {
                network.add_arc(v_out(u), v_in(v), INFINITE_CAPACITY);
            }
        }

        let mut ek = EdmondsKarp::new(network);
        let value = match limit {
            Some(limit) => {
                let flow = ek.max_flow_upto(limit);
                if flow >= limit {
                    return None;
                }
                flow
            }
            None => ek.max_flow(),
        };

        if value >= INFINITE_CAPACITY {
            return None;
        }

        // v belongs to the cut iff v_in is reachable in the residual network but v_out is not
        let reachable = ek.residual_network().reachable_from_source();
        let separator = nodes
            .iter()
            .copied()
            .filter(|&u| u != s && u != t && reachable[v_in(u)] && !reachable[v_out(u)])
            .collect();

        Some(VertexSeparator {
            value,
            nodes: separator,
        })
    }
}

impl<T: AdjacencyList + AdjacencyTest> MinVertexCut for T {}

#[cfg(test)]
mod tests {
    use super::*;

    const EDGES: [(Node, Node); 13] = [
        (0, 1),
        (0, 2),
        (0, 3),
        (1, 2),
        (2, 3),
        (2, 6),
        (3, 6),
        (4, 2),
        (4, 7),
        (5, 1),
        (5, 7),
        (6, 7),
        (6, 5),
    ];

    fn network_for(edges: &[(Node, Node)], n: usize, s: usize, t: usize) -> ResidualNetwork {
        let mut network = ResidualNetwork::new(n, s, t);
        for &(u, v) in edges {
            network.add_undirected(u as usize, v as usize, 1.0);
        }
        network
    }

    #[test]
    fn edmonds_karp() {
        let mut ek = EdmondsKarp::new(network_for(&EDGES, 8, 0, 7));
        assert!((ek.max_flow() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn edmonds_karp_fractional() {
        let mut network = ResidualNetwork::new(4, 0, 3);
        network.add_arc(0, 1, 0.5);
        network.add_arc(0, 2, 0.25);
        network.add_arc(1, 3, 0.3);
        network.add_arc(2, 3, 1.0);
        network.add_arc(1, 2, 1.0);
        let mut ek = EdmondsKarp::new(network);
        assert!((ek.max_flow() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn flow_upto() {
        let mut ek = EdmondsKarp::new(network_for(&EDGES, 8, 0, 7));
        let flow = ek.max_flow_upto(1.0);
        assert!(flow >= 1.0);
        assert!(flow <= 3.0);
    }

    #[test]
    fn min_st_separator() {
        let graph = WeightedGraph::from_profits_and_edges(&[0.0; 8], &EDGES).unwrap();

        // adjacent terminals cannot be separated
        assert!(graph.min_st_vertex_separator(0, 1, |_| 1.0, None).is_none());

        let cut = graph.min_st_vertex_separator(0, 7, |_| 1.0, None).unwrap();
        // 0-1-5-7, 0-2-4-7 and 0-3-6-7 are vertex disjoint
        assert!((cut.value - 3.0).abs() < 1e-9);
        assert_eq!(cut.nodes.len(), 3);
        let rest: Vec<Node> = graph
            .vertices_sorted()
            .into_iter()
            .filter(|v| !cut.nodes.contains(v))
            .collect();
        let sub = graph.induced_subgraph(&rest).unwrap();
        assert!(!sub.reachable_within(0, |_| true).contains(&7));

        assert!(graph.min_st_vertex_separator(0, 7, |_| 1.0, Some(2.5)).is_none());
    }

    #[test]
    fn separator_prefers_cheap_nodes() {
        // 0 - 1 - 2 - 3 - 4 with 1 and 3 expensive
        let graph = WeightedGraph::from_profits_and_edges(
            &[0.0; 5],
            &[(0, 1), (1, 2), (2, 3), (3, 4)],
        )
        .unwrap();
        let cut = graph
            .min_st_vertex_separator(0, 4, |v| if v == 2 { 0.1 } else { 0.9 }, None)
            .unwrap();
        assert_eq!(cut.nodes, vec![2]);
        assert!((cut.value - 0.1).abs() < 1e-9);
    }

    #[test]
    fn disconnected_terminals() {
        let graph = WeightedGraph::from_profits_and_edges(&[0.0; 3], &[(0, 1)]).unwrap();
        let cut = graph.min_st_vertex_separator(0, 2, |_| 1.0, None).unwrap();
        assert!(cut.nodes.is_empty());
        assert_eq!(cut.value, 0.0);
    }
}
