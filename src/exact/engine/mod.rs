//! Narrow interface between the cutting-plane solver and a mixed-integer programming engine.
//!
//! The solver describes a 0/1 program as a [`Model`], hands it to a [`MipEngine`] and takes part
//! in the search through a [`CutCallback`] that is offered every relaxation solution.

use super::bb_stats::BBStats;
use crate::error::Result;
use std::time::Instant;

mod branch_and_cut;
mod simplex;

pub use branch_and_cut::SimplexBranchAndCut;
pub use simplex::{LpOutcome, LpSolver};

pub type VarIndex = usize;

/// Tolerance under which a value counts as integral
pub const INTEGRALITY_EPS: f64 = 1e-6;

/// The inequality `sum coefficients[i].1 * x[coefficients[i].0] <= rhs`
#[derive(Clone, Debug, PartialEq)]
pub struct LinearCut {
    pub coefficients: Vec<(VarIndex, f64)>,
    pub rhs: f64,
}

impl LinearCut {
    pub fn new(coefficients: Vec<(VarIndex, f64)>, rhs: f64) -> Self {
        Self { coefficients, rhs }
    }

    /// Left-hand side evaluated at `x`
    pub fn activity(&self, x: &[f64]) -> f64 {
        self.coefficients.iter().map(|&(i, a)| a * x[i]).sum()
    }

    /// Amount by which `x` violates the inequality (negative if satisfied with slack)
    pub fn violation(&self, x: &[f64]) -> f64 {
        self.activity(x) - self.rhs
    }

    pub fn is_violated(&self, x: &[f64], tolerance: f64) -> bool {
        self.violation(x) > tolerance
    }

    /// Rough memory footprint in bytes
    pub fn memory_estimate(&self) -> usize {
        std::mem::size_of::<Self>() + self.coefficients.len() * std::mem::size_of::<(usize, f64)>()
    }
}

/// 0/1 maximisation program: `max objective * x` subject to all constraints and
/// `lower <= x <= upper` with every variable binary.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub objective: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub constraints: Vec<LinearCut>,
}

impl Model {
    /// Creates a model with `n` binary variables and the given objective
    pub fn binary(objective: Vec<f64>) -> Self {
        let n = objective.len();
        Self {
            objective,
            lower: vec![0.0; n],
            upper: vec![1.0; n],
            constraints: Vec::new(),
        }
    }

    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }

    pub fn fix(&mut self, var: VarIndex, value: f64) {
        self.lower[var] = value;
        self.upper[var] = value;
    }

    pub fn add_constraint(&mut self, cut: LinearCut) {
        self.constraints.push(cut);
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective.iter().zip(x).map(|(c, v)| c * v).sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineStatus {
    /// The search tree was exhausted; the incumbent is optimal
    Optimal,
    TimeLimit,
    MemoryLimit,
    /// No integral point satisfies the model and all cuts
    Infeasible,
}

/// Resource ceilings of one engine run
#[derive(Clone, Copy, Debug, Default)]
pub struct Limits {
    pub deadline: Option<Instant>,
    pub memory_limit: Option<usize>,
    pub threads: usize,
}

/// Hooks through which the engine consults the caller during the search
pub trait CutCallback {
    /// Offered every relaxation solution. `integral` is set if `x` is integral; in that case
    /// the returned cuts must cut off `x` unless `x` is feasible for the caller (lazy constraints).
    fn separate(&mut self, x: &[f64], integral: bool) -> Vec<LinearCut>;

    /// Called whenever the engine accepts a new incumbent
    fn on_incumbent(&mut self, _value: f64, _bound: f64) {}

    /// Called after every search node with the current incumbent value and global bound
    fn on_progress(&mut self, _incumbent: f64, _bound: f64) {}
}

/// A branch-and-cut capable engine for 0/1 programs
pub trait MipEngine {
    /// Replaces the current model; drops cuts and incumbent of a previous run
    fn load(&mut self, model: Model);

    /// Adds a globally valid inequality; it is never removed again
    fn add_cut(&mut self, cut: LinearCut);

    /// Provides a feasible solution to start from
    fn set_incumbent(&mut self, x: Vec<f64>, value: f64);

    fn set_limits(&mut self, limits: Limits);

    /// Runs the search. Resource limits end the search normally with the respective status.
    fn solve(&mut self, callback: &mut dyn CutCallback) -> Result<EngineStatus>;

    /// Best known solution and its objective value
    fn incumbent(&self) -> Option<(&[f64], f64)>;

    /// Best proven upper bound on the objective
    fn best_bound(&self) -> f64;

    fn stats(&self) -> &BBStats;
}

/// Returns true iff all entries of `x` are within [`INTEGRALITY_EPS`] of an integer
pub fn is_integral(x: &[f64]) -> bool {
    x.iter().all(|v| (v - v.round()).abs() <= INTEGRALITY_EPS)
}
