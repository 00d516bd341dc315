//! Solves the unrooted problem by a sequence of rooted solves.
//!
//! The positive nodes are ordered by decreasing profit. Every optimal non-empty module contains
//! a positive node; if `c_k` is the first candidate it contains, the module lives in the
//! component of `c_k` after deleting `c_0, ..., c_{k-1}`. Solving each candidate rooted on that
//! component hence covers all modules while the instances shrink with `k`.

use super::*;
use crate::error::MwcsError;
use crate::options::Options;
use fxhash::FxHashMap;
use itertools::Itertools;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::time::Instant;

/// Returns the positive nodes ordered by decreasing profit (ties by id). Fails with
/// [`MwcsError::NoCandidateRoots`] if the graph has no nodes at all.
pub fn candidate_roots(graph: &WeightedGraph) -> Result<Vec<Node>> {
    if graph.is_empty() {
        return Err(MwcsError::NoCandidateRoots);
    }
    Ok(graph
        .vertices_sorted()
        .into_iter()
        .filter(|&u| graph.profit(u) > 0.0)
        .sorted_by(|&a, &b| {
            graph
                .profit(b)
                .partial_cmp(&graph.profit(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        })
        .collect())
}

#[derive(Debug)]
enum CandidateOutcome {
    Solved(SolutionCertificate),
    /// Trivial bound could not beat the best module known at that time
    Pruned(Weight),
    /// Not started because the deadline had passed
    Skipped(Weight),
    Failed(Weight),
}

impl CandidateOutcome {
    fn bound(&self) -> Weight {
        match self {
            CandidateOutcome::Solved(certificate) => certificate.upper_bound,
            CandidateOutcome::Pruned(bound)
            | CandidateOutcome::Skipped(bound)
            | CandidateOutcome::Failed(bound) => *bound,
        }
    }
}

/// Unrooted solver that runs the rooted solver produced by `factory` once per candidate root.
/// Candidates are processed on a thread pool with `options.threads` workers; every rooted solve
/// gets an equal share of the thread budget.
pub struct EnumSolverUnrooted<F> {
    options: Options,
    factory: F,
    solution: Option<SolutionCertificate>,
    solved: usize,
    pruned: usize,
}

impl<F, R> EnumSolverUnrooted<F>
where
    F: Fn(&Options) -> R + Sync,
    R: RootedSolver,
{
    pub fn new(options: &Options, factory: F) -> Self {
        Self {
            options: options.with_root(None),
            factory,
            solution: None,
            solved: 0,
            pruned: 0,
        }
    }

    /// Number of candidates solved and pruned in the last run
    pub fn candidate_counts(&self) -> (usize, usize) {
        (self.solved, self.pruned)
    }

    fn solve_candidate(
        &self,
        graph: &WeightedGraph,
        rank: &FxHashMap<Node, usize>,
        k: usize,
        root: Node,
        deadline: Option<Instant>,
        threads: usize,
        best: &Mutex<Weight>,
    ) -> CandidateOutcome {
        let component = graph.reachable_within(root, |v| rank.get(&v).map_or(true, |&i| i >= k));
        let trivial_bound: Weight = component
            .iter()
            .map(|&u| graph.profit(u).max(0.0))
            .sum();

        if deadline.map_or(false, |d| Instant::now() >= d) {
            return CandidateOutcome::Skipped(trivial_bound);
        }
        if trivial_bound < *best.lock() {
            return CandidateOutcome::Pruned(trivial_bound);
        }

        let outcome = graph.induced_subgraph(&component).and_then(|subgraph| {
            let options = self
                .options
                .with_threads(threads)
                .with_root(Some(root))
                .with_deadline(deadline);
            (self.factory)(&options).solve_rooted(&subgraph, root)
        });

        match outcome {
            Ok(certificate) => {
                info!(
                    "Candidate {} (node {}): weight {} bound {} on {} nodes",
                    k,
                    root,
                    certificate.weight,
                    certificate.upper_bound,
                    component.len()
                );
                let mut best = best.lock();
                *best = best.max(certificate.weight);
                CandidateOutcome::Solved(certificate)
            }
            Err(e) => {
                warn!("Skipping candidate root {}: {}", root, e);
                CandidateOutcome::Failed(trivial_bound)
            }
        }
    }
}

impl<F, R> SolutionAccess for EnumSolverUnrooted<F>
where
    F: Fn(&Options) -> R + Sync,
    R: RootedSolver,
{
    fn solution(&self) -> Option<&SolutionCertificate> {
        self.solution.as_ref()
    }
}

impl<F, R> UnrootedSolver for EnumSolverUnrooted<F>
where
    F: Fn(&Options) -> R + Sync,
    R: RootedSolver,
{
    fn solve_unrooted(&mut self, graph: &WeightedGraph) -> Result<SolutionCertificate> {
        let deadline = self.options.deadline_from(Instant::now());

        let candidates = match candidate_roots(graph) {
            Ok(candidates) => candidates,
            Err(MwcsError::NoCandidateRoots) => {
                debug!("Empty graph, returning the empty module");
                let certificate = SolutionCertificate::empty();
                self.solution = Some(certificate.clone());
                return Ok(certificate);
            }
            Err(e) => return Err(e),
        };

        let rank: FxHashMap<Node, usize> =
            candidates.iter().enumerate().map(|(k, &u)| (u, k)).collect();
        let workers = self.options.threads.min(candidates.len()).max(1);
        let threads_per_solve = (self.options.threads / workers).max(1);
        info!(
            "{} candidate roots, {} workers with {} thread(s) each",
            candidates.len(),
            workers,
            threads_per_solve
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| MwcsError::Config(e.to_string()))?;

        let best = Mutex::new(0.0);
        let this = &*self;
        let outcomes: Vec<CandidateOutcome> = pool.install(|| {
            candidates
                .par_iter()
                .enumerate()
                .map(|(k, &root)| {
                    this.solve_candidate(graph, &rank, k, root, deadline, threads_per_solve, &best)
                })
                .collect()
        });

        // deterministic selection: heaviest module, earliest candidate on ties
        let mut module = Vec::new();
        let mut weight = 0.0;
        let mut trace = vec![];
        let upper_bound = outcomes
            .iter()
            .map(CandidateOutcome::bound)
            .fold(0.0, Weight::max);

        let mut hit_memory_limit = false;
        for outcome in &outcomes {
            if let CandidateOutcome::Solved(certificate) = outcome {
                hit_memory_limit |= certificate.status == SolveStatus::MemoryLimit;
                if certificate.weight > weight {
                    weight = certificate.weight;
                    module = certificate.module.clone();
                    trace.push(BoundEvent {
                        weight,
                        bound: upper_bound,
                    });
                }
            }
        }
        if trace.is_empty() {
            trace.push(BoundEvent {
                weight,
                bound: upper_bound,
            });
        }

        let status = if weight >= upper_bound {
            SolveStatus::Optimal
        } else if hit_memory_limit {
            SolveStatus::MemoryLimit
        } else {
            SolveStatus::TimeLimit
        };

        self.solved = outcomes
            .iter()
            .filter(|o| matches!(o, CandidateOutcome::Solved(_)))
            .count();
        self.pruned = outcomes
            .iter()
            .filter(|o| matches!(o, CandidateOutcome::Pruned(_)))
            .count();
        info!(
            "Unrooted solve: weight {} bound {} ({} solved, {} pruned, {} candidates)",
            weight,
            upper_bound,
            self.solved,
            self.pruned,
            candidates.len()
        );

        let certificate = SolutionCertificate {
            module,
            weight,
            upper_bound,
            status,
            trace,
        };
        self.solution = Some(certificate.clone());
        Ok(certificate)
    }
}
