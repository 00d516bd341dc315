//! Monte Carlo tree heuristic.
//!
//! Each iteration assigns costs to the edges, extracts a minimum spanning forest and solves the
//! problem exactly on that forest by dynamic programming. A module of a spanning tree is
//! connected in the graph, so every iteration yields a feasible module; randomised edge costs
//! let different iterations explore different trees.

use crate::algorithm::{IterativeAlgorithm, TerminatingIterativeAlgorithm};
use crate::error::{MwcsError, Result};
use crate::exact::*;
use crate::graph::*;
use crate::options::Options;
use fxhash::FxHashMap;
use itertools::Itertools;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use std::time::Instant;

/// Cost function used to weight the edges before extracting a spanning forest
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeHeuristic {
    /// All edges cost the same
    Uniform,
    /// Uniformly random costs in [0, 1)
    Random,
    /// Negated profit of both endpoints
    Profit,
    /// Negated profit of both endpoints scaled by a random factor in [0.5, 1.5)
    ProfitRandom,
}

impl Default for EdgeHeuristic {
    fn default() -> Self {
        EdgeHeuristic::ProfitRandom
    }
}

impl EdgeHeuristic {
    /// Parses the numeric selector of the command line (0 uniform, 1 random, 2 profit,
    /// 3 profit-random)
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(EdgeHeuristic::Uniform),
            1 => Some(EdgeHeuristic::Random),
            2 => Some(EdgeHeuristic::Profit),
            3 => Some(EdgeHeuristic::ProfitRandom),
            _ => None,
        }
    }
}

/// Negative nodes whose positive neighbours outweigh them. Edges at such hubs get cheaper so
/// that spanning trees tend to route through them.
#[derive(Clone, Debug, Default)]
pub struct NegHubAnalysis {
    gains: FxHashMap<Node, Weight>,
}

impl NegHubAnalysis {
    pub fn analyze(graph: &WeightedGraph) -> Self {
        let gains = graph
            .vertices()
            .filter(|&v| graph.profit(v) < 0.0)
            .filter_map(|v| {
                let gain = graph.profit(v)
                    + graph
                        .neighbors(v)
                        .map(|w| graph.profit(w).max(0.0))
                        .sum::<Weight>();
                (gain > 0.0).then(|| (v, gain))
            })
            .collect();
        Self { gains }
    }

    pub fn number_of_beneficial_hubs(&self) -> usize {
        self.gains.len()
    }

    /// Net gain of the hub `u` together with its positive neighbours, if `u` is beneficial
    pub fn gain_of(&self, u: Node) -> Option<Weight> {
        self.gains.get(&u).copied()
    }
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut u: usize) -> usize {
        while self.parent[u] != u {
            self.parent[u] = self.parent[self.parent[u]];
            u = self.parent[u];
        }
        u
    }

    /// Returns false if both elements already share a set
    fn union(&mut self, u: usize, v: usize) -> bool {
        let (ru, rv) = (self.find(u), self.find(v));
        if ru == rv {
            return false;
        }
        match self.rank[ru].cmp(&self.rank[rv]) {
            std::cmp::Ordering::Less => self.parent[ru] = rv,
            std::cmp::Ordering::Greater => self.parent[rv] = ru,
            std::cmp::Ordering::Equal => {
                self.parent[rv] = ru;
                self.rank[ru] += 1;
            }
        }
        true
    }
}

/// Iterative tree heuristic on a fixed graph; see the module documentation.
pub struct TreeHeuristicSolver<'a> {
    graph: &'a WeightedGraph,
    nodes: Vec<Node>,
    profits: Vec<Weight>,
    edges: Vec<(usize, usize)>,
    root: Option<usize>,
    heuristic: EdgeHeuristic,
    analysis: Option<NegHubAnalysis>,
    rng: Pcg64,
    iteration: usize,
    max_iterations: usize,
    best: Option<(Vec<Node>, Weight)>,
    trace: Vec<BoundEvent>,
}

impl<'a> TreeHeuristicSolver<'a> {
    /// Fails if `root` is given but not a node of `graph`
    pub fn new(
        graph: &'a WeightedGraph,
        root: Option<Node>,
        heuristic: EdgeHeuristic,
        max_iterations: usize,
        seed: u64,
    ) -> Result<Self> {
        let nodes = graph.vertices_sorted();
        let index: FxHashMap<Node, usize> =
            nodes.iter().enumerate().map(|(i, &u)| (u, i)).collect();
        let root = match root {
            Some(r) => Some(*index.get(&r).ok_or(MwcsError::InvalidReference(r))?),
            None => None,
        };
        let edges = graph
            .edges_sorted()
            .into_iter()
            .map(|(u, v)| (index[&u], index[&v]))
            .collect();

        // the root alone and the empty module are the feasible starting points
        let best = match root {
            Some(r) => Some((vec![nodes[r]], graph.profit(nodes[r]))),
            None => Some((Vec::new(), 0.0)),
        };

        Ok(Self {
            graph,
            profits: nodes.iter().map(|&u| graph.profit(u)).collect(),
            nodes,
            edges,
            root,
            heuristic,
            analysis: None,
            rng: Pcg64::seed_from_u64(seed),
            iteration: 0,
            max_iterations,
            best,
            trace: Vec::new(),
        })
    }

    /// Biases the edge costs towards beneficial negative hubs
    pub fn with_analysis(mut self, analysis: NegHubAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Improvements of the best module over the iterations
    pub fn trace(&self) -> &[BoundEvent] {
        &self.trace
    }

    /// Trivial upper bound: all positive profit reachable, plus the root's loss if negative
    pub fn upper_bound(&self) -> Weight {
        let positive: Weight = self.profits.iter().map(|p| p.max(0.0)).sum();
        match self.root {
            Some(r) => positive + self.profits[r].min(0.0),
            None => positive,
        }
    }

    fn edge_costs(&mut self) -> Vec<f64> {
        let mut costs = Vec::with_capacity(self.edges.len());
        for &(i, j) in &self.edges {
            let profit = self.profits[i] + self.profits[j];
            let mut cost = match self.heuristic {
                EdgeHeuristic::Uniform => 1.0,
                EdgeHeuristic::Random => self.rng.gen::<f64>(),
                EdgeHeuristic::Profit => -profit,
                EdgeHeuristic::ProfitRandom => -profit * self.rng.gen_range(0.5..1.5),
            };
            if let Some(analysis) = &self.analysis {
                for k in [i, j] {
                    if let Some(gain) = analysis.gain_of(self.nodes[k]) {
                        cost -= gain;
                    }
                }
            }
            costs.push(cost);
        }
        costs
    }

    /// Kruskal: returns the adjacency lists of a minimum spanning forest
    fn spanning_forest(&self, costs: &[f64]) -> Vec<Vec<usize>> {
        let order = (0..self.edges.len()).sorted_by(|&a, &b| {
            costs[a]
                .partial_cmp(&costs[b])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let n = self.nodes.len();
        let mut uf = UnionFind::new(n);
        let mut forest = vec![Vec::new(); n];
        for e in order {
            let (i, j) = self.edges[e];
            if uf.union(i, j) {
                forest[i].push(j);
                forest[j].push(i);
            }
        }
        forest
    }

    /// Best module on the forest: either the best subtree rooted anywhere or, with a root, the
    /// best subtree containing the root.
    fn solve_forest(&self, forest: &[Vec<usize>]) -> (Vec<usize>, Weight) {
        let n = self.nodes.len();
        let mut parent = vec![usize::MAX; n];
        let mut visited = vec![false; n];
        let mut best_down = vec![0.0; n];

        let starts: Vec<usize> = match self.root {
            Some(r) => vec![r],
            None => (0..n).collect(),
        };

        let mut best: Option<(usize, Weight)> = None;
        for s in starts {
            if visited[s] {
                continue;
            }
            // pre-order of the tree containing s
            let mut order = vec![s];
            visited[s] = true;
            let mut i = 0;
            while i < order.len() {
                let u = order[i];
                for &v in &forest[u] {
                    if !visited[v] {
                        visited[v] = true;
                        parent[v] = u;
                        order.push(v);
                    }
                }
                i += 1;
            }

            for &u in order.iter().rev() {
                best_down[u] += self.profits[u];
                if parent[u] != usize::MAX && best_down[u] > 0.0 {
                    let p = parent[u];
                    best_down[p] += best_down[u];
                }
            }

            let candidates: Vec<usize> = match self.root {
                Some(r) => vec![r],
                None => order,
            };
            for u in candidates {
                if best.map_or(true, |(_, w)| best_down[u] > w) {
                    best = Some((u, best_down[u]));
                }
            }
        }

        let (top, weight) = match best {
            Some(best) => best,
            None => return (Vec::new(), 0.0),
        };

        let mut module = vec![top];
        let mut i = 0;
        while i < module.len() {
            let u = module[i];
            for &v in &forest[u] {
                if parent[v] == u && best_down[v] > 0.0 {
                    module.push(v);
                }
            }
            i += 1;
        }
        (module, weight)
    }
}

impl<'a> IterativeAlgorithm for TreeHeuristicSolver<'a> {
    fn execute_step(&mut self) {
        let costs = self.edge_costs();
        let forest = self.spanning_forest(&costs);
        let (module, weight) = self.solve_forest(&forest);

        let improves = match &self.best {
            Some((_, best)) => weight > *best,
            None => true,
        };
        if improves && (self.root.is_some() || !module.is_empty()) {
            let module = module.into_iter().map(|i| self.nodes[i]).sorted().collect_vec();
            debug!("Iteration {}: improved to {}", self.iteration, weight);
            self.trace.push(BoundEvent {
                weight,
                bound: self.upper_bound(),
            });
            self.best = Some((module, weight));
        }
        self.iteration += 1;
    }

    fn is_completed(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    fn best_known_solution(&mut self) -> Option<&[Node]> {
        self.best.as_ref().map(|(module, _)| module.as_slice())
    }

    fn best_known_solution_weight(&mut self) -> Option<Weight> {
        self.best.as_ref().map(|(_, weight)| *weight)
    }
}

impl<'a> TerminatingIterativeAlgorithm for TreeHeuristicSolver<'a> {}

/// Solver contract around [`TreeHeuristicSolver`]: runs the configured number of iterations,
/// or fewer if the time limit of the options expires first.
pub struct TreeHeuristic {
    options: Options,
    heuristic: EdgeHeuristic,
    iterations: usize,
    analyze_hubs: bool,
    solution: Option<SolutionCertificate>,
}

impl TreeHeuristic {
    pub fn new(options: &Options, heuristic: EdgeHeuristic, iterations: usize) -> Self {
        Self {
            options: options.clone(),
            heuristic,
            iterations,
            analyze_hubs: true,
            solution: None,
        }
    }

    pub fn with_hub_analysis(mut self, analyze: bool) -> Self {
        self.analyze_hubs = analyze;
        self
    }

    fn run(&mut self, graph: &WeightedGraph, root: Option<Node>) -> Result<SolutionCertificate> {
        if graph.number_of_weighted_edges() > 0 {
            let (subdivided, edge_nodes) = graph.subdivide_edge_costs()?;
            let certificate = self
                .run(&subdivided, root)?
                .project_edge_nodes(&subdivided, &edge_nodes);
            self.solution = Some(certificate.clone());
            return Ok(certificate);
        }

        let start = Instant::now();
        let mut solver =
            TreeHeuristicSolver::new(graph, root, self.heuristic, self.iterations, self.options.seed)?;
        if self.analyze_hubs {
            let analysis = NegHubAnalysis::analyze(graph);
            info!(
                "Number of beneficial negative hubs: {}",
                analysis.number_of_beneficial_hubs()
            );
            solver = solver.with_analysis(analysis);
        }

        match self.options.time_limit {
            Some(limit) => solver.run_until_timeout(limit.saturating_sub(start.elapsed())),
            None => {
                solver.run_to_completion();
            }
        }

        let upper_bound = solver.upper_bound();
        let module = solver.best_known_solution().map(|m| m.to_vec()).unwrap_or_default();
        let weight = solver
            .best_known_solution_weight()
            .unwrap_or_else(|| graph.weight_of(&module));
        let mut trace = solver.trace().to_vec();
        if trace.is_empty() {
            trace.push(BoundEvent {
                weight,
                bound: upper_bound,
            });
        }

        let certificate = SolutionCertificate {
            module,
            weight,
            upper_bound,
            status: if weight >= upper_bound {
                SolveStatus::Optimal
            } else {
                SolveStatus::TimeLimit
            },
            trace,
        };
        self.solution = Some(certificate.clone());
        Ok(certificate)
    }
}

impl SolutionAccess for TreeHeuristic {
    fn solution(&self) -> Option<&SolutionCertificate> {
        self.solution.as_ref()
    }
}

impl RootedSolver for TreeHeuristic {
    fn solve_rooted(&mut self, graph: &WeightedGraph, root: Node) -> Result<SolutionCertificate> {
        self.run(graph, Some(root))
    }
}

impl UnrootedSolver for TreeHeuristic {
    fn solve_unrooted(&mut self, graph: &WeightedGraph) -> Result<SolutionCertificate> {
        self.run(graph, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::weighted_graph::tests::path_graph;
    use crate::testing::*;

    #[test]
    fn path_graph_is_a_tree() {
        let graph = path_graph();
        for heuristic in [
            EdgeHeuristic::Uniform,
            EdgeHeuristic::Random,
            EdgeHeuristic::Profit,
            EdgeHeuristic::ProfitRandom,
        ] {
            let mut solver = TreeHeuristicSolver::new(&graph, None, heuristic, 1, 0).unwrap();
            assert_eq!(solver.run_to_completion(), Some(vec![0, 1, 2]));
            assert_eq!(solver.best_known_solution_weight(), Some(6.0));

            let mut solver = TreeHeuristicSolver::new(&graph, Some(3), heuristic, 1, 0).unwrap();
            assert_eq!(solver.run_to_completion(), Some(vec![0, 1, 2, 3]));
            assert_eq!(solver.best_known_solution_weight(), Some(-4.0));
        }
    }

    #[test]
    fn negative_graph_gives_empty_module() {
        let graph = WeightedGraph::from_profits_and_edges(&[-1.0, -3.0], &[(0, 1)]).unwrap();
        let mut solver = TreeHeuristicSolver::new(&graph, None, EdgeHeuristic::Uniform, 3, 0).unwrap();
        assert_eq!(solver.run_to_completion(), Some(vec![]));
        assert_eq!(solver.best_known_solution_weight(), Some(0.0));
    }

    #[test]
    fn rooted_without_iterations() {
        let graph = path_graph();
        let mut solver = TreeHeuristicSolver::new(&graph, Some(2), EdgeHeuristic::Uniform, 0, 0).unwrap();
        assert_eq!(solver.run_to_completion(), Some(vec![2]));
        assert_eq!(solver.best_known_solution_weight(), Some(3.0));

        let certificate = TreeHeuristic::new(&Options::default(), EdgeHeuristic::Uniform, 0)
            .solve_rooted(&graph, 3)
            .unwrap();
        assert_eq!(certificate.module, vec![3]);
        assert_eq!(certificate.weight, -10.0);
        assert_eq!(certificate.trace.len(), 1);
    }

    #[test]
    fn edge_costs_are_respected() {
        let mut graph = WeightedGraph::from_profits_and_edges(&[5.0, 5.0], &[]).unwrap();
        graph.add_weighted_edge(0, 1, -20.0).unwrap();
        let certificate = TreeHeuristic::new(&Options::default(), EdgeHeuristic::Profit, 5)
            .solve_unrooted(&graph)
            .unwrap();
        assert_eq!(certificate.module.len(), 1);
        assert_eq!(certificate.weight, 5.0);
    }

    #[test]
    fn invalid_root() {
        assert!(matches!(
            TreeHeuristicSolver::new(&path_graph(), Some(7), EdgeHeuristic::Uniform, 1, 0),
            Err(MwcsError::InvalidReference(7))
        ));
    }

    #[test]
    fn hub_analysis() {
        // 1 is a negative hub between three positive nodes; 4 is a hopeless negative node
        let graph = WeightedGraph::from_profits_and_edges(
            &[2.0, -3.0, 2.0, 2.0, -5.0],
            &[(0, 1), (1, 2), (1, 3), (3, 4)],
        )
        .unwrap();
        let analysis = NegHubAnalysis::analyze(&graph);
        assert_eq!(analysis.number_of_beneficial_hubs(), 1);
        assert_eq!(analysis.gain_of(1), Some(3.0));
        assert_eq!(analysis.gain_of(4), None);
    }

    #[test]
    fn reproducible_with_seed() {
        let mut rng = rand_pcg::Pcg64::seed_from_u64(17);
        let graph = random_graph(&mut rng, 14, 0.3);
        let run = |seed| {
            let options = Options {
                seed,
                ..Options::default()
            };
            TreeHeuristic::new(&options, EdgeHeuristic::ProfitRandom, 1)
                .solve_unrooted(&graph)
                .unwrap()
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn modules_are_feasible() {
        let mut rng = rand_pcg::Pcg64::seed_from_u64(23);
        for i in 0..50 {
            let n = rng.gen_range(1..10);
            let graph = random_graph(&mut rng, n, 0.3);
            let heuristic = EdgeHeuristic::from_index(i % 4).unwrap();
            let mut solver = TreeHeuristic::new(&Options::default(), heuristic, 10);

            let certificate = solver.solve_unrooted(&graph).unwrap();
            let (_, optimum) = brute_force(&graph, None);
            assert!(graph.is_connected_set(&certificate.module).unwrap());
            assert!((graph.weight_of(&certificate.module) - certificate.weight).abs() < 1e-9);
            assert!(certificate.weight <= optimum + 1e-9);
            assert!(certificate.upper_bound >= optimum - 1e-9);

            let root = rng.gen_range(0..n) as Node;
            let certificate = solver.solve_rooted(&graph, root).unwrap();
            assert!(certificate.module.contains(&root));
            assert!(graph.is_connected_set(&certificate.module).unwrap());
            assert!(certificate.weight <= brute_force(&graph, Some(root)).1 + 1e-9);
        }
    }
}
