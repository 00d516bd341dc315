use crate::error::{MwcsError, Result};
use crate::exact::backoff::BackOffFunction;
use crate::graph::Node;
use derive_builder::Builder;
use std::time::{Duration, Instant};

/// Memory ceiling used by the command line tools when nothing else is configured (8 GiB).
pub const DEFAULT_MEMORY_LIMIT: usize = 8 << 30;

/// Flags that steer which inequalities the cutting-plane solver generates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CutStrategy {
    /// Run min-cut separation on fractional relaxation points (paced by the back-off scheduler).
    /// Integral points are always checked.
    pub separate_fractional: bool,
    /// Add `x_v <= sum of neighbours` for every non-root node to the initial model.
    pub degree_constraints: bool,
    /// Seed the engine with a greedy connected solution grown from the root.
    pub primal_heuristic: bool,
}

impl Default for CutStrategy {
    fn default() -> Self {
        Self {
            separate_fractional: true,
            degree_constraints: true,
            primal_heuristic: true,
        }
    }
}

/// Run configuration shared by the reduction engine and all solvers. Build it via
/// [`OptionsBuilder`] and pass it around by reference; it is never mutated after a solve started.
///
/// # Example
/// ```
/// use mwcs::options::OptionsBuilder;
/// use std::time::Duration;
/// let options = OptionsBuilder::default()
///     .time_limit(Duration::from_secs(10))
///     .threads(2usize)
///     .build()
///     .unwrap();
/// assert_eq!(options.threads, 2);
/// assert_eq!(options.max_cuts_per_round, 10);
/// ```
#[derive(Clone, Debug, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Options {
    /// Wall-clock budget of a complete solve; `None` runs until optimality is proven
    #[builder(setter(strip_option), default)]
    pub time_limit: Option<Duration>,

    /// Memory ceiling in bytes for the branch-and-cut search
    #[builder(setter(strip_option), default)]
    pub memory_limit: Option<usize>,

    #[builder(default = "1")]
    pub threads: usize,

    #[builder(default)]
    pub backoff: BackOffFunction,

    /// Fixed root; unrooted solving if `None`
    #[builder(setter(strip_option), default)]
    pub root: Option<Node>,

    #[builder(default = "10")]
    pub max_cuts_per_round: usize,

    #[builder(default)]
    pub cut_strategy: CutStrategy,

    /// Upper limit on reduction passes; run to the fixed point if `None`
    #[builder(setter(strip_option), default)]
    pub max_reduction_passes: Option<usize>,

    #[builder(default = "true")]
    pub preprocess: bool,

    /// Seed of all randomised components
    #[builder(default = "0")]
    pub seed: u64,
}

impl OptionsBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(0) = self.threads {
            return Err("thread count must be positive".into());
        }
        if let Some(0) = self.max_cuts_per_round {
            return Err("at least one cut per round must be allowed".into());
        }
        Ok(())
    }

    /// Same as [`OptionsBuilder::build`] but reports failures as [`MwcsError::Config`].
    pub fn finish(&self) -> Result<Options> {
        self.build().map_err(|e| MwcsError::Config(e.to_string()))
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            time_limit: None,
            memory_limit: None,
            threads: 1,
            backoff: BackOffFunction::default(),
            root: None,
            max_cuts_per_round: 10,
            cut_strategy: CutStrategy::default(),
            max_reduction_passes: None,
            preprocess: true,
            seed: 0,
        }
    }
}

impl Options {
    /// Returns the absolute deadline of a solve starting at `start`.
    pub fn deadline_from(&self, start: Instant) -> Option<Instant> {
        self.time_limit.map(|limit| start + limit)
    }

    /// Returns a copy that uses `threads` worker threads; used to partition the thread budget
    /// among concurrent rooted solves.
    pub fn with_threads(&self, threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            ..self.clone()
        }
    }

    /// Returns a copy with the root replaced.
    pub fn with_root(&self, root: Option<Node>) -> Self {
        Self {
            root,
            ..self.clone()
        }
    }

    /// Returns a copy whose time budget ends at `deadline` (measured from now).
    pub fn with_deadline(&self, deadline: Option<Instant>) -> Self {
        Self {
            time_limit: deadline.map(|d| d.saturating_duration_since(Instant::now())),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = OptionsBuilder::default().build().unwrap();
        assert_eq!(options.threads, 1);
        assert_eq!(options.max_cuts_per_round, 10);
        assert!(options.time_limit.is_none());
        assert!(options.root.is_none());
        assert!(options.preprocess);
        assert_eq!(options.backoff, BackOffFunction::Linear);
    }

    #[test]
    fn rejects_zero_threads() {
        let res = OptionsBuilder::default().threads(0usize).finish();
        assert!(matches!(res, Err(MwcsError::Config(_))));
    }

    #[test]
    fn partitioning() {
        let options = OptionsBuilder::default()
            .threads(8usize)
            .root(3)
            .build()
            .unwrap();
        let single = options.with_threads(0);
        assert_eq!(single.threads, 1);
        assert_eq!(single.root, Some(3));
        assert_eq!(options.with_root(None).root, None);
    }
}
