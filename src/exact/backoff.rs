//! Pacing of the separation routine.
//!
//! Separating fractional points is expensive, while its benefit shrinks deeper in the search
//! tree. [`BackOff`] lets the first relaxation of a solve separate and then waits for a growing
//! number of relaxations before it allows the next separation round.

/// Growth of the waiting time as a function of the number of back-offs so far
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BackOffFunction {
    /// Always wait one relaxation
    Constant,
    /// Wait `n` relaxations after the `n`-th separation
    #[default]
    Linear,
    /// Wait `n^2` relaxations after the `n`-th separation
    Quadratic,
    /// Wait `2^n` relaxations after the `n`-th separation
    Exponential,
}

impl BackOffFunction {
    /// Returns the waiting time after `n_backoffs` separation rounds
    pub fn waiting_time(self, n_backoffs: u32) -> u64 {
        let n = n_backoffs as u64;
        match self {
            BackOffFunction::Constant => 1,
            BackOffFunction::Linear => n,
            BackOffFunction::Quadratic => n.saturating_mul(n),
            BackOffFunction::Exponential => 1u64.checked_shl(n_backoffs).unwrap_or(u64::MAX),
        }
    }

    /// Parses the numeric selector used on the command line (0 constant, 1 linear,
    /// 2 quadratic, 3 exponential)
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(BackOffFunction::Constant),
            1 => Some(BackOffFunction::Linear),
            2 => Some(BackOffFunction::Quadratic),
            3 => Some(BackOffFunction::Exponential),
            _ => None,
        }
    }
}

/// Decides per relaxation whether a separation round should run. Implementations are plain
/// state machines without any knowledge of the graph.
pub trait SeparationSchedule {
    /// Restores the initial state; called at the start of every solve
    fn reset(&mut self);

    /// Registers one relaxation and returns true iff separation should run for it
    fn make_attempt(&mut self) -> bool;
}

#[derive(Clone, Debug)]
pub struct BackOff {
    function: BackOffFunction,
    counter: u64,
    waiting_time: u64,
    n_backoffs: u32,
}

impl BackOff {
    pub fn new(function: BackOffFunction) -> Self {
        Self {
            function,
            counter: 0,
            waiting_time: 0,
            n_backoffs: 0,
        }
    }

    pub fn function(&self) -> BackOffFunction {
        self.function
    }

    /// Number of separation rounds granted since the last reset
    pub fn n_backoffs(&self) -> u32 {
        self.n_backoffs
    }

    pub fn waiting_time(&self) -> u64 {
        self.waiting_time
    }
}

impl Default for BackOff {
    fn default() -> Self {
        Self::new(BackOffFunction::default())
    }
}

impl SeparationSchedule for BackOff {
    fn reset(&mut self) {
        self.counter = 0;
        self.waiting_time = 0;
        self.n_backoffs = 0;
    }

    fn make_attempt(&mut self) -> bool {
        if self.counter >= self.waiting_time {
            self.counter = 0;
            self.n_backoffs += 1;
            self.waiting_time = self.function.waiting_time(self.n_backoffs);
            true
        } else {
            self.counter += 1;
            false
        }
    }
}

/// Schedule that separates after every relaxation
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysSeparate;

impl SeparationSchedule for AlwaysSeparate {
    fn reset(&mut self) {}

    fn make_attempt(&mut self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(function: BackOffFunction, rounds: usize) -> Vec<bool> {
        let mut backoff = BackOff::new(function);
        (0..rounds).map(|_| backoff.make_attempt()).collect()
    }

    #[test]
    fn linear() {
        // separate, wait 1, separate, wait 2, separate, wait 3, ...
        let expected = [
            true, false, true, false, false, true, false, false, false, true,
        ];
        assert_eq!(pattern(BackOffFunction::Linear, 10), expected);
    }

    #[test]
    fn constant() {
        let expected = [true, false, true, false, true, false];
        assert_eq!(pattern(BackOffFunction::Constant, 6), expected);
    }

    #[test]
    fn quadratic_and_exponential() {
        let quad = pattern(BackOffFunction::Quadratic, 8);
        assert_eq!(quad, [true, false, true, false, false, false, false, true]);

        let exp = pattern(BackOffFunction::Exponential, 8);
        assert_eq!(exp, [true, false, false, true, false, false, false, false]);
    }

    #[test]
    fn reset_restarts_schedule() {
        let mut backoff = BackOff::default();
        for _ in 0..20 {
            backoff.make_attempt();
        }
        assert!(backoff.n_backoffs() > 1);
        backoff.reset();
        assert_eq!(backoff.n_backoffs(), 0);
        assert!(backoff.make_attempt());
        assert!(!backoff.make_attempt());
    }

    #[test]
    fn waiting_times_do_not_overflow() {
        assert_eq!(BackOffFunction::Exponential.waiting_time(200), u64::MAX);
        assert_eq!(BackOffFunction::Quadratic.waiting_time(3), 9);
        assert_eq!(BackOffFunction::from_index(1), Some(BackOffFunction::Linear));
        assert_eq!(BackOffFunction::from_index(9), None);
    }
}
