use super::simplex::{LpOutcome, LpSolver};
use super::*;
use crate::error::MwcsError;
use log::{debug, trace};
use std::time::Instant;

/// LP values within this distance of the incumbent cannot improve it
const PRUNE_EPS: f64 = 1e-7;

/// Minimum violation for a cut to be added
const CUT_VIOLATION_EPS: f64 = 1e-6;

const DEFAULT_SEPARATION_ROUNDS: usize = 50;

#[derive(Clone, Debug)]
struct SearchNode {
    lower: Vec<f64>,
    upper: Vec<f64>,
    /// Upper bound inherited from the parent relaxation
    bound: f64,
    depth: usize,
}

impl SearchNode {
    fn memory_estimate(&self) -> usize {
        std::mem::size_of::<Self>() + 2 * self.lower.len() * std::mem::size_of::<f64>()
    }
}

enum NodeResult {
    Pruned,
    Solved,
    Branched(Box<(SearchNode, SearchNode)>),
    /// A resource ceiling was hit before the node was finished
    Interrupted(EngineStatus),
}

/// Depth-first branch-and-cut over the dense simplex in [`LpSolver`].
///
/// Every integral relaxation solution is offered to the callback before it may become the
/// incumbent, so the callback can enforce constraints lazily. Fractional solutions are
/// offered for a bounded number of separation rounds per search node; afterwards the engine
/// branches on the most fractional variable, exploring `x = 1` first.
pub struct SimplexBranchAndCut {
    model: Model,
    cuts: Vec<LinearCut>,
    incumbent: Option<(Vec<f64>, f64)>,
    limits: Limits,
    best_bound: f64,
    stats: BBStats,
    separation_rounds: usize,
}

impl Default for SimplexBranchAndCut {
    fn default() -> Self {
        Self::new()
    }
}

impl SimplexBranchAndCut {
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            cuts: Vec::new(),
            incumbent: None,
            limits: Limits::default(),
            best_bound: f64::INFINITY,
            stats: BBStats::new(),
            separation_rounds: DEFAULT_SEPARATION_ROUNDS,
        }
    }

    /// Maximum number of fractional separation rounds per search node
    pub fn with_separation_rounds(mut self, rounds: usize) -> Self {
        self.separation_rounds = rounds;
        self
    }

    fn incumbent_value(&self) -> f64 {
        self.incumbent
            .as_ref()
            .map_or(f64::NEG_INFINITY, |(_, value)| *value)
    }

    fn trivial_bound(&self) -> f64 {
        self.model
            .objective
            .iter()
            .zip(self.model.lower.iter().zip(&self.model.upper))
            .map(|(&c, (&l, &u))| (c * l).max(c * u))
            .sum()
    }

    /// Bytes held across search nodes: model rows, cut pool, open nodes and variable vectors.
    /// The relaxation of a node is accounted for separately before it is built.
    fn memory_estimate(&self, open: &[SearchNode]) -> usize {
        let constraints: usize = self
            .model
            .constraints
            .iter()
            .chain(&self.cuts)
            .map(LinearCut::memory_estimate)
            .sum();
        let nodes: usize = open.iter().map(SearchNode::memory_estimate).sum();
        let vars = 3 * self.model.num_vars() * std::mem::size_of::<f64>();
        constraints + nodes + vars
    }

    fn limit_reached(&self, open: &[SearchNode]) -> Option<EngineStatus> {
        if let Some(deadline) = self.limits.deadline {
            if Instant::now() >= deadline {
                return Some(EngineStatus::TimeLimit);
            }
        }
        if let Some(limit) = self.limits.memory_limit {
            if self.memory_estimate(open) > limit {
                return Some(EngineStatus::MemoryLimit);
            }
        }
        None
    }

    fn deadline_passed(&self) -> bool {
        self.limits.deadline.map_or(false, |d| Instant::now() >= d)
    }

    /// Solves the LP relaxation with the variable bounds of a search node. Fixed variables are
    /// substituted; the remaining ones get the rows `x <= 1`. Returns `None` without building the
    /// LP if its tableau on top of `reserved` bytes would exceed the memory ceiling.
    fn solve_relaxation(
        &mut self,
        lower: &[f64],
        upper: &[f64],
        reserved: usize,
    ) -> Result<Option<LpOutcome>> {
        let n = self.model.num_vars();
        let mut column_of = vec![usize::MAX; n];
        let mut free = Vec::new();
        for j in 0..n {
            if upper[j] - lower[j] > INTEGRALITY_EPS {
                column_of[j] = free.len();
                free.push(j);
            }
        }

        if let Some(limit) = self.limits.memory_limit {
            let max_rows = self.model.constraints.len() + self.cuts.len() + free.len();
            let needed = reserved + LpSolver::memory_estimate(max_rows, free.len());
            if needed > limit {
                debug!(
                    "Relaxation with {} columns needs {} bytes, limit is {}",
                    free.len(),
                    needed,
                    limit
                );
                return Ok(None);
            }
        }

        let constant: f64 = (0..n)
            .filter(|&j| column_of[j] == usize::MAX)
            .map(|j| self.model.objective[j] * lower[j])
            .sum();

        let mut rows = Vec::new();
        let mut rhs = Vec::new();
        for cut in self.model.constraints.iter().chain(&self.cuts) {
            let mut row = vec![0.0; free.len()];
            let mut b = cut.rhs;
            let mut has_free = false;
            for &(var, coef) in &cut.coefficients {
                if column_of[var] == usize::MAX {
                    b -= coef * lower[var];
                } else {
                    row[column_of[var]] += coef;
                    has_free = true;
                }
            }
            if !has_free {
                if b < -CUT_VIOLATION_EPS {
                    return Ok(Some(LpOutcome::Infeasible));
                }
                continue;
            }
            rows.push(row);
            rhs.push(b);
        }
        for (col, &j) in free.iter().enumerate() {
            let mut row = vec![0.0; free.len()];
            row[col] = 1.0;
            rows.push(row);
            rhs.push(upper[j] - lower[j]);
        }

        let objective: Vec<f64> = free.iter().map(|&j| self.model.objective[j]).collect();
        self.stats.lp_solves += 1;
        let outcome = LpSolver::new(&rows, &rhs, &objective)
            .with_deadline(self.limits.deadline)
            .solve()?;

        Ok(Some(match outcome {
            LpOutcome::Optimal { value, x } => {
                let mut full = lower.to_vec();
                for (col, &j) in free.iter().enumerate() {
                    full[j] = lower[j] + x[col];
                }
                LpOutcome::Optimal {
                    value: value + constant,
                    x: full,
                }
            }
            other => other,
        }))
    }

    fn add_violated(&mut self, cuts: Vec<LinearCut>, x: &[f64]) -> usize {
        let before = self.cuts.len();
        self.cuts.extend(
            cuts.into_iter()
                .filter(|cut| cut.is_violated(x, CUT_VIOLATION_EPS)),
        );
        let added = self.cuts.len() - before;
        self.stats.cuts_added += added;
        added
    }

    fn process_node(
        &mut self,
        node: &SearchNode,
        open: &[SearchNode],
        callback: &mut dyn CutCallback,
    ) -> Result<NodeResult> {
        let mut rounds = 0;
        loop {
            if self.deadline_passed() {
                return Ok(NodeResult::Interrupted(EngineStatus::TimeLimit));
            }

            // the cut pool grows between rounds, so the estimate is refreshed every time
            let reserved = self.memory_estimate(open) + node.memory_estimate();
            let outcome = match self.solve_relaxation(&node.lower, &node.upper, reserved)? {
                Some(outcome) => outcome,
                None => return Ok(NodeResult::Interrupted(EngineStatus::MemoryLimit)),
            };
            let (value, x) = match outcome {
                LpOutcome::Optimal { value, x } => (value, x),
                LpOutcome::Infeasible => return Ok(NodeResult::Pruned),
                LpOutcome::Unbounded => {
                    return Err(MwcsError::Engine("unbounded relaxation".into()))
                }
                LpOutcome::Interrupted => {
                    return Ok(NodeResult::Interrupted(EngineStatus::TimeLimit))
                }
            };

            if value <= self.incumbent_value() + PRUNE_EPS {
                return Ok(NodeResult::Pruned);
            }

            if is_integral(&x) {
                let x: Vec<f64> = x.iter().map(|v| v.round()).collect();
                let cuts = callback.separate(&x, true);
                if self.add_violated(cuts, &x) > 0 {
                    continue;
                }
                let value = self.model.objective_value(&x);
                trace!("new incumbent {} at depth {}", value, node.depth);
                self.incumbent = Some((x, value));
                callback.on_incumbent(value, self.best_bound.max(value));
                return Ok(NodeResult::Solved);
            }

            if rounds < self.separation_rounds {
                rounds += 1;
                let cuts = callback.separate(&x, false);
                if self.add_violated(cuts, &x) > 0 {
                    continue;
                }
            }

            let var = most_fractional(&x);
            let mut down = node.clone();
            down.upper[var] = 0.0;
            down.bound = value;
            down.depth += 1;
            let mut up = node.clone();
            up.lower[var] = 1.0;
            up.bound = value;
            up.depth += 1;
            return Ok(NodeResult::Branched(Box::new((down, up))));
        }
    }

    fn update_bound(&mut self, open: &[SearchNode]) {
        let open_bound = open
            .iter()
            .map(|node| node.bound)
            .fold(f64::NEG_INFINITY, f64::max);
        let global = open_bound.max(self.incumbent_value());
        self.best_bound = self.best_bound.min(global);
    }
}

fn most_fractional(x: &[f64]) -> VarIndex {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, v) in x.iter().enumerate() {
        let dist = (v - v.floor() - 0.5).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

impl MipEngine for SimplexBranchAndCut {
    fn load(&mut self, model: Model) {
        self.model = model;
        self.cuts.clear();
        self.incumbent = None;
        self.best_bound = f64::INFINITY;
        self.stats = BBStats::new();
    }

    fn add_cut(&mut self, cut: LinearCut) {
        self.cuts.push(cut);
    }

    fn set_incumbent(&mut self, x: Vec<f64>, value: f64) {
        if value > self.incumbent_value() {
            self.incumbent = Some((x, value));
        }
    }

    fn set_limits(&mut self, limits: Limits) {
        self.limits = limits;
    }

    fn solve(&mut self, callback: &mut dyn CutCallback) -> Result<EngineStatus> {
        let root = SearchNode {
            lower: self.model.lower.clone(),
            upper: self.model.upper.clone(),
            bound: self.trivial_bound(),
            depth: 0,
        };
        self.best_bound = root.bound.max(self.incumbent_value());
        debug!(
            "Branch-and-cut on {} variables and {} constraints, {} thread(s)",
            self.model.num_vars(),
            self.model.constraints.len(),
            self.limits.threads.max(1)
        );

        let mut open = vec![root];
        loop {
            if let Some(status) = self.limit_reached(&open) {
                debug!("Branch-and-cut stopped: {:?} after {} nodes", status, self.stats.nodes);
                return Ok(status);
            }

            let node = match open.pop() {
                Some(node) => node,
                None => break,
            };

            if node.bound <= self.incumbent_value() + PRUNE_EPS {
                self.stats.pruned += 1;
                continue;
            }

            self.stats.entered_at(node.depth);
            match self.process_node(&node, &open, callback)? {
                NodeResult::Pruned => self.stats.pruned += 1,
                NodeResult::Solved => {}
                NodeResult::Branched(children) => {
                    let (down, up) = *children;
                    open.push(down);
                    open.push(up);
                }
                NodeResult::Interrupted(status) => {
                    open.push(node);
                    self.update_bound(&open);
                    debug!("Branch-and-cut stopped: {:?} after {} nodes", status, self.stats.nodes);
                    return Ok(status);
                }
            }

            self.update_bound(&open);
            callback.on_progress(self.incumbent_value(), self.best_bound);
        }

        match self.incumbent {
            Some((_, value)) => {
                self.best_bound = value;
                debug!(
                    "Branch-and-cut finished: value {} after {} nodes, {} LPs, {} cuts",
                    value, self.stats.nodes, self.stats.lp_solves, self.stats.cuts_added
                );
                Ok(EngineStatus::Optimal)
            }
            None => Ok(EngineStatus::Infeasible),
        }
    }

    fn incumbent(&self) -> Option<(&[f64], f64)> {
        self.incumbent
            .as_ref()
            .map(|(x, value)| (x.as_slice(), *value))
    }

    fn best_bound(&self) -> f64 {
        self.best_bound
    }

    fn stats(&self) -> &BBStats {
        &self.stats
    }
}
