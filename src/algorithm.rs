//! Heuristic solvers implement the [`IterativeAlgorithm`] trait.
//!
//! The idea is to allow co-operative scheduling, i.e. an algorithm does some work (say one
//! Monte Carlo round) and then returns to the caller, which can report progress, check a time
//! budget and invoke the algorithm again at a later point to continue its work.

use crate::graph::{Node, Weight};
use std::time::{Duration, Instant};

/// [`IterativeAlgorithm`] provides a consistent interface to execute the iterative solvers.
/// Observe that it does not prescribe any constructor which is left to the algorithm designer
/// as each algorithm has specific parameters et cetera.
///
/// As an adopter of [`IterativeAlgorithm`], you have to implement at least the methods
///   [`IterativeAlgorithm::execute_step`],
///   [`IterativeAlgorithm::is_completed`] and [`IterativeAlgorithm::best_known_solution`].
/// You may also implement [`IterativeAlgorithm::best_known_solution_weight`] if the weight of
/// the solution is tracked anyway.
///
/// If your algorithm is known to eventually terminate please also implement the marker trait
/// [`TerminatingIterativeAlgorithm`].
///
/// # Example
/// ```
/// use mwcs::algorithm::IterativeAlgorithm;
/// use mwcs::graph::Node;
/// struct MyAlgorithm {
///    solution: Option<Vec<Node>>
/// }
///
/// impl IterativeAlgorithm for MyAlgorithm {
///     fn execute_step(&mut self) {
///         self.solution = Some(vec![0]);
///     }
///
///     fn is_completed(&self) -> bool {
///         self.solution.is_some()
///     }
///
///     fn best_known_solution(&mut self) -> Option<&[Node]> {
///         self.solution.as_deref()
///     }
/// }
/// ```
pub trait IterativeAlgorithm {
    /// Advances the computation of this algorithm by one round.
    fn execute_step(&mut self);

    /// Returns true iff the algorithm is completed and [`IterativeAlgorithm::execute_step`] may not
    /// be called again.
    fn is_completed(&self) -> bool;

    /// Returns the currently best known module or None if no solution is known yet.
    fn best_known_solution(&mut self) -> Option<&[Node]>;

    /// Returns the weight of the currently best known module.
    fn best_known_solution_weight(&mut self) -> Option<Weight> {
        None
    }

    /// Executes the algorithm and keeps calling [`IterativeAlgorithm::execute_step`] until the
    /// `predicate` becomes true or [`IterativeAlgorithm::is_completed`] becomes true. The predicate
    /// is evaluated after each iteration, i.e. a step is carried out even if it always holds.
    fn run_while<F: FnMut(&mut Self) -> bool>(&mut self, mut predicate: F) {
        while !self.is_completed() {
            self.execute_step();

            if predicate(self) {
                break;
            }
        }
    }

    /// Executes the algorithm until either the timeout occurred or
    /// [`IterativeAlgorithm::is_completed`] is true. The timeout is only checked between steps.
    fn run_until_timeout(&mut self, timeout: Duration) {
        let start = Instant::now();
        self.run_while(|_| start.elapsed() >= timeout);
    }
}

/// [`TerminatingIterativeAlgorithm`] is a marker trait, i.e. to adopt it, you give an empty `impl`
/// block. Add this trait to algorithms that will eventually terminate.
pub trait TerminatingIterativeAlgorithm: IterativeAlgorithm {
    /// Executes the algorithm until it completed and returns the solution if one was found.
    fn run_to_completion(&mut self) -> Option<Vec<Node>> {
        while !self.is_completed() {
            self.execute_step();
        }
        Some(self.best_known_solution()?.to_vec())
    }
}
