use crate::error::{MwcsError, Result};
use std::time::Instant;

const EPS: f64 = 1e-9;

/// Number of Dantzig pivots after which pricing falls back to Bland's rule
const BLAND_THRESHOLD: usize = 5_000;

const DEFAULT_ITERATION_LIMIT: usize = 200_000;

/// The deadline is polled every this many pivots
const DEADLINE_CHECK_INTERVAL: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum LpOutcome {
    Optimal { value: f64, x: Vec<f64> },
    Infeasible,
    Unbounded,
    /// The deadline passed before the LP was solved
    Interrupted,
}

enum PhaseEnd {
    Optimal,
    Unbounded,
    Interrupted,
}

/// Dense two-phase simplex for `max c*x s.t. Ax <= b, x >= 0`.
///
/// The tableau has two extra rows (objective of phase 2 and phase 1) and two extra columns
/// (artificial variable and right-hand side). Basic and non-basic variables are tracked in
/// `basic` and `non_basic`; the artificial variable carries the index -1.
pub struct LpSolver {
    m: usize,
    n: usize,
    basic: Vec<isize>,
    non_basic: Vec<isize>,
    d: Vec<Vec<f64>>,
    iterations: usize,
    iteration_limit: usize,
    deadline: Option<Instant>,
}

impl LpSolver {
    /// Panics if the dimensions of `a`, `b` and `c` disagree
    pub fn new(a: &[Vec<f64>], b: &[f64], c: &[f64]) -> Self {
        let m = b.len();
        let n = c.len();
        assert_eq!(a.len(), m);

        let mut d = vec![vec![0.0; n + 2]; m + 2];
        for (i, row) in a.iter().enumerate() {
            assert_eq!(row.len(), n);
            d[i][..n].copy_from_slice(row);
            d[i][n] = -1.0;
            d[i][n + 1] = b[i];
        }
        for (j, &cj) in c.iter().enumerate() {
            d[m][j] = -cj;
        }
        d[m + 1][n] = 1.0;

        let mut non_basic: Vec<isize> = (0..n as isize).collect();
        non_basic.push(-1);

        Self {
            m,
            n,
            basic: (n as isize..(n + m) as isize).collect(),
            non_basic,
            d,
            iterations: 0,
            iteration_limit: DEFAULT_ITERATION_LIMIT,
            deadline: None,
        }
    }

    /// Bytes taken by the dense rows and the tableau of an LP with `m` rows and `n` columns
    pub fn memory_estimate(m: usize, n: usize) -> usize {
        (m * n + (m + 2) * (n + 2)) * std::mem::size_of::<f64>()
    }

    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = limit;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Number of pivots carried out so far
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn pivot(&mut self, r: usize, s: usize) {
        let inv = 1.0 / self.d[r][s];
        let pivot_row = self.d[r].clone();
        for i in 0..self.m + 2 {
            if i == r {
                continue;
            }
            let factor = self.d[i][s] * inv;
            if factor == 0.0 {
                continue;
            }
            for (j, &pr) in pivot_row.iter().enumerate() {
                if j != s {
                    self.d[i][j] -= pr * factor;
                }
            }
            self.d[i][s] = -factor;
        }
        for (j, v) in self.d[r].iter_mut().enumerate() {
            if j != s {
                *v *= inv;
            }
        }
        self.d[r][s] = inv;
        std::mem::swap(&mut self.basic[r], &mut self.non_basic[s]);
        self.iterations += 1;
    }

    fn entering_column(&self, objective_row: usize, phase: u8) -> Option<usize> {
        let row = &self.d[objective_row];
        let candidates = (0..=self.n).filter(|&j| phase == 1 || self.non_basic[j] != -1);

        if self.iterations < BLAND_THRESHOLD {
            let s = candidates.min_by(|&a, &b| {
                row[a]
                    .partial_cmp(&row[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(self.non_basic[a].cmp(&self.non_basic[b]))
            })?;
            (row[s] < -EPS).then(|| s)
        } else {
            candidates
                .filter(|&j| row[j] < -EPS)
                .min_by_key(|&j| self.non_basic[j])
        }
    }

    fn leaving_row(&self, s: usize) -> Option<usize> {
        let rhs = self.n + 1;
        let mut r: Option<usize> = None;
        for i in 0..self.m {
            if self.d[i][s] < EPS {
                continue;
            }
            r = match r {
                None => Some(i),
                Some(r) => {
                    let ratio_i = self.d[i][rhs] / self.d[i][s];
                    let ratio_r = self.d[r][rhs] / self.d[r][s];
                    if ratio_i < ratio_r || (ratio_i == ratio_r && self.basic[i] < self.basic[r]) {
                        Some(i)
                    } else {
                        Some(r)
                    }
                }
            };
        }
        r
    }

    fn simplex(&mut self, phase: u8) -> Result<PhaseEnd> {
        let objective_row = if phase == 1 { self.m + 1 } else { self.m };
        let mut pivots = 0;
        loop {
            if self.iterations >= self.iteration_limit {
                return Err(MwcsError::Engine(format!(
                    "simplex exceeded {} pivots",
                    self.iteration_limit
                )));
            }
            if pivots % DEADLINE_CHECK_INTERVAL == 0
                && self.deadline.map_or(false, |d| Instant::now() >= d)
            {
                return Ok(PhaseEnd::Interrupted);
            }

            let s = match self.entering_column(objective_row, phase) {
                Some(s) => s,
                None => return Ok(PhaseEnd::Optimal),
            };

            match self.leaving_row(s) {
                Some(r) => {
                    self.pivot(r, s);
                    pivots += 1;
                }
                None => return Ok(PhaseEnd::Unbounded),
            }
        }
    }

    pub fn solve(&mut self) -> Result<LpOutcome> {
        let (m, n) = (self.m, self.n);

        if m == 0 {
            if self.d[m][..n].iter().any(|&v| v < -EPS) {
                return Ok(LpOutcome::Unbounded);
            }
            return Ok(LpOutcome::Optimal {
                value: 0.0,
                x: vec![0.0; n],
            });
        }

        let r = (0..m)
            .min_by(|&a, &b| {
                self.d[a][n + 1]
                    .partial_cmp(&self.d[b][n + 1])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(0);

        if self.d[r][n + 1] < -EPS {
            self.pivot(r, n);
            match self.simplex(1)? {
                PhaseEnd::Interrupted => return Ok(LpOutcome::Interrupted),
                PhaseEnd::Unbounded => return Ok(LpOutcome::Infeasible),
                PhaseEnd::Optimal if self.d[m + 1][n + 1] < -1e-7 => {
                    return Ok(LpOutcome::Infeasible)
                }
                PhaseEnd::Optimal => {}
            }

            // drive the artificial variable out of the basis
            for i in 0..m {
                if self.basic[i] != -1 {
                    continue;
                }
                let s = (0..=n).max_by(|&a, &b| {
                    self.d[i][a]
                        .abs()
                        .partial_cmp(&self.d[i][b].abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                if let Some(s) = s {
                    if self.d[i][s].abs() > EPS {
                        self.pivot(i, s);
                    }
                }
            }
        }

        match self.simplex(2)? {
            PhaseEnd::Optimal => {}
            PhaseEnd::Unbounded => return Ok(LpOutcome::Unbounded),
            PhaseEnd::Interrupted => return Ok(LpOutcome::Interrupted),
        }

        let mut x = vec![0.0; n];
        for i in 0..m {
            let b = self.basic[i];
            if b >= 0 && (b as usize) < n {
                x[b as usize] = self.d[i][n + 1];
            }
        }

        Ok(LpOutcome::Optimal {
            value: self.d[m][n + 1],
            x,
        })
    }
}
