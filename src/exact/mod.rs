//! Exact solving: the rooted and unrooted solver contracts, the cutting-plane rooted solver
//! and the pipeline that combines them with the reduction engine.

pub mod backoff;
pub mod bb_stats;
pub mod cut_solver;
pub mod engine;
pub mod separation;
pub mod unrooted;

pub use backoff::{BackOff, BackOffFunction, SeparationSchedule};
pub use cut_solver::CutSolverRooted;
pub use unrooted::EnumSolverUnrooted;

use crate::error::{MwcsError, Result};
use crate::graph::*;
use crate::kernelization::{reduce_graph, ReductionRecord};
use crate::options::Options;
use fxhash::FxHashMap;
use log::info;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    /// The weight equals the upper bound
    Optimal,
    /// The deadline was reached; the bound may not be tight
    TimeLimit,
    /// The memory ceiling was reached; the bound may not be tight
    MemoryLimit,
}

/// An incumbent improvement as reported during a solve
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundEvent {
    pub weight: Weight,
    pub bound: Weight,
}

/// Result of a solve. `module` is connected in the graph that was solved and contains the root
/// of rooted solves; `trace` lists the incumbent improvements with non-decreasing weight and
/// non-increasing bound.
#[derive(Clone, Debug, PartialEq)]
pub struct SolutionCertificate {
    pub module: Vec<Node>,
    pub weight: Weight,
    pub upper_bound: Weight,
    pub status: SolveStatus,
    pub trace: Vec<BoundEvent>,
}

impl SolutionCertificate {
    /// The empty module, optimal for unrooted instances without positive nodes
    pub fn empty() -> Self {
        Self {
            module: Vec::new(),
            weight: 0.0,
            upper_bound: 0.0,
            status: SolveStatus::Optimal,
            trace: vec![BoundEvent {
                weight: 0.0,
                bound: 0.0,
            }],
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Maps a certificate of the graph returned by [`WeightedGraph::subdivide_edge_costs`] back
    /// onto the nodes of the graph it was built from
    pub fn project_edge_nodes(
        self,
        subdivided: &WeightedGraph,
        edge_nodes: &FxHashMap<Node, Edge>,
    ) -> Self {
        let (module, weight) = subdivided.project_subdivided_module(edge_nodes, &self.module);
        let upper_bound = self.upper_bound.max(weight);
        let status = if weight >= upper_bound {
            SolveStatus::Optimal
        } else {
            self.status
        };
        Self {
            module,
            weight,
            upper_bound,
            status,
            trace: self.trace,
        }
    }

    /// Maps a certificate of a reduced instance back onto the original graph
    fn finalize(self, record: &ReductionRecord) -> Self {
        let (module, weight) = record.finalize(&self.module, self.weight);
        let upper_bound = record.finalize_bound(self.upper_bound).max(weight);
        let fallback = record.best_fallback().map_or(Weight::NEG_INFINITY, |f| f.weight);

        let mut trace: Vec<BoundEvent> = self
            .trace
            .iter()
            .map(|e| BoundEvent {
                weight: e.weight.max(fallback),
                bound: record.finalize_bound(e.bound),
            })
            .collect();
        trace.dedup();

        let status = if weight >= upper_bound {
            SolveStatus::Optimal
        } else {
            self.status
        };

        Self {
            module,
            weight,
            upper_bound,
            status,
            trace,
        }
    }
}

/// Read access to the result of the last completed solve
pub trait SolutionAccess {
    fn solution(&self) -> Option<&SolutionCertificate>;

    fn solution_weight(&self) -> Option<Weight> {
        self.solution().map(|s| s.weight)
    }

    fn solution_weight_upper_bound(&self) -> Option<Weight> {
        self.solution().map(|s| s.upper_bound)
    }

    fn solution_module(&self) -> Option<&[Node]> {
        self.solution().map(|s| s.module.as_slice())
    }
}

/// Computes a maximum weight connected module that contains a fixed root
pub trait RootedSolver: SolutionAccess {
    fn solve_rooted(&mut self, graph: &WeightedGraph, root: Node) -> Result<SolutionCertificate>;
}

/// Computes a maximum weight connected module; the empty module is feasible
pub trait UnrootedSolver: SolutionAccess {
    fn solve_unrooted(&mut self, graph: &WeightedGraph) -> Result<SolutionCertificate>;
}

/// Reduces `graph` (unless disabled) and solves the reduced instance with the cutting-plane
/// solver, rooted at `options.root` if set and by root enumeration otherwise. The returned
/// certificate refers to the nodes of `graph`.
///
/// Weighted edges are edge costs: they are subdivided into nodes before solving and the
/// weight of the result includes the costs of the edges its module uses. Positive edge
/// weights are rejected with [`MwcsError::Config`].
///
/// # Example
/// ```
/// use mwcs::exact::solve_exact;
/// use mwcs::graph::*;
/// use mwcs::options::Options;
/// let graph = WeightedGraph::from_profits_and_edges(
///     &[5.0, -2.0, 3.0, -10.0], &[(0, 1), (1, 2), (2, 3)]).unwrap();
/// let certificate = solve_exact(&graph, &Options::default()).unwrap();
/// assert_eq!(certificate.module, vec![0, 1, 2]);
/// assert_eq!(certificate.weight, 6.0);
/// ```
pub fn solve_exact(graph: &WeightedGraph, options: &Options) -> Result<SolutionCertificate> {
    if graph.number_of_weighted_edges() == 0 {
        return solve_node_weighted(graph, options);
    }

    let (subdivided, edge_nodes) = graph.subdivide_edge_costs()?;
    info!("Subdivided {} weighted edges", edge_nodes.len());
    let certificate = solve_node_weighted(&subdivided, options)?;
    Ok(certificate.project_edge_nodes(&subdivided, &edge_nodes))
}

fn solve_node_weighted(graph: &WeightedGraph, options: &Options) -> Result<SolutionCertificate> {
    let start = Instant::now();
    let deadline = options.deadline_from(start);

    let (reduced, record) = if options.preprocess {
        reduce_graph(graph.clone(), options.root, options.max_reduction_passes)?
    } else {
        if let Some(root) = options.root {
            if !graph.has_vertex(root) {
                return Err(MwcsError::InvalidReference(root));
            }
        }
        (graph.clone(), ReductionRecord::default())
    };
    info!(
        "Reduced instance: {} nodes, {} edges (from {} nodes, {} edges)",
        reduced.number_of_nodes(),
        reduced.number_of_edges(),
        graph.number_of_nodes(),
        graph.number_of_edges()
    );

    let options = options.with_deadline(deadline);
    let certificate = match options.root {
        Some(root) => CutSolverRooted::new(&options).solve_rooted(&reduced, root)?,
        None => EnumSolverUnrooted::new(&options, |o: &Options| CutSolverRooted::new(o))
            .solve_unrooted(&reduced)?,
    };

    Ok(certificate.finalize(&record))
}

/// Returns up to `count` node-disjoint modules: after each unrooted solve the nodes of the
/// module are removed and the remaining graph is solved again. Stops early once the best
/// remaining module is empty. `options.root` is ignored.
pub fn enumerate_modules(
    graph: &WeightedGraph,
    options: &Options,
    count: usize,
) -> Result<Vec<SolutionCertificate>> {
    let options = options.with_root(None);
    let mut remaining = graph.clone();
    let mut modules = Vec::with_capacity(count);

    while modules.len() < count {
        let certificate = solve_exact(&remaining, &options)?;
        if certificate.module.is_empty() {
            break;
        }
        info!(
            "Module {} with {} nodes and weight {}",
            modules.len(),
            certificate.module.len(),
            certificate.weight
        );
        remaining = remaining.without_nodes(&certificate.module);
        modules.push(certificate);
    }

    Ok(modules)
}
