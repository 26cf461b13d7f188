//! Deterministic fault injection for forecast fetches.
//!
//! The upstream client registers every forecast fetch attempt with a
//! [`FaultInjector`] before it touches the network. The injector owns the
//! attempt counter and decides whether that attempt fails synthetically.
//! Counting happens before the decision, so the counter tracks attempts, not
//! successes.

use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of registering one fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultDecision {
    /// Issue the real upstream request.
    Proceed { attempt: u64 },
    /// Fail this attempt without calling upstream.
    Fail { attempt: u64 },
}

impl FaultDecision {
    pub fn attempt(&self) -> u64 {
        match self {
            FaultDecision::Proceed { attempt } | FaultDecision::Fail { attempt } => *attempt,
        }
    }
}

/// Strategy deciding which forecast fetch attempts fail.
///
/// Implementations must count attempts atomically: concurrent callers never
/// share or skip an attempt number.
pub trait FaultInjector: Send + Sync {
    /// Count one attempt and decide its fate.
    fn register_attempt(&self) -> FaultDecision;

    /// Attempts registered so far.
    fn attempts(&self) -> u64;
}

/// Fails every attempt whose number is a multiple of `every`.
///
/// The counter is monotonic and never reset. `every == 0` disables failures
/// while still counting.
#[derive(Debug)]
pub struct EveryNthFault {
    every: u64,
    counter: AtomicU64,
}

impl EveryNthFault {
    pub fn new(every: u64) -> Self {
        Self::starting_at(every, 0)
    }

    /// Start counting from `attempts` instead of zero.
    pub fn starting_at(every: u64, attempts: u64) -> Self {
        Self {
            every,
            counter: AtomicU64::new(attempts),
        }
    }

    pub fn every(&self) -> u64 {
        self.every
    }
}

impl FaultInjector for EveryNthFault {
    fn register_attempt(&self) -> FaultDecision {
        let attempt = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if self.every != 0 && attempt % self.every == 0 {
            FaultDecision::Fail { attempt }
        } else {
            FaultDecision::Proceed { attempt }
        }
    }

    fn attempts(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

/// Never fails; only counts attempts.
#[derive(Debug, Default)]
pub struct NoFaults {
    counter: AtomicU64,
}

impl NoFaults {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FaultInjector for NoFaults {
    fn register_attempt(&self) -> FaultDecision {
        let attempt = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        FaultDecision::Proceed { attempt }
    }

    fn attempts(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_every_fifth_attempt_fails() {
        let faults = EveryNthFault::new(5);
        let decisions: Vec<_> = (0..10).map(|_| faults.register_attempt()).collect();

        let failed: Vec<u64> = decisions
            .iter()
            .filter(|d| matches!(d, FaultDecision::Fail { .. }))
            .map(FaultDecision::attempt)
            .collect();

        assert_eq!(failed, vec![5, 10]);
        assert_eq!(faults.attempts(), 10);
    }

    #[test]
    fn test_starting_at_four_fails_next() {
        let faults = EveryNthFault::starting_at(5, 4);
        assert_eq!(faults.register_attempt(), FaultDecision::Fail { attempt: 5 });
        assert_eq!(faults.register_attempt(), FaultDecision::Proceed { attempt: 6 });
    }

    #[test]
    fn test_zero_disables_failures() {
        let faults = EveryNthFault::new(0);
        assert!((0..20).all(|_| matches!(faults.register_attempt(), FaultDecision::Proceed { .. })));
        assert_eq!(faults.attempts(), 20);
    }

    #[test]
    fn test_no_faults_counts() {
        let faults = NoFaults::new();
        faults.register_attempt();
        faults.register_attempt();
        assert_eq!(faults.attempts(), 2);
    }

    #[test]
    fn test_concurrent_attempts_are_not_lost() {
        let faults = Arc::new(EveryNthFault::new(5));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let faults = faults.clone();
                std::thread::spawn(move || {
                    (0..250)
                        .filter(|_| matches!(faults.register_attempt(), FaultDecision::Fail { .. }))
                        .count()
                })
            })
            .collect();

        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(faults.attempts(), 2000);
        assert_eq!(failures, 400);
    }
}
