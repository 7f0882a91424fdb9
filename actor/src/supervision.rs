// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Supervision strategies
//!

use std::{collections::VecDeque, fmt::Debug, time::Duration};

use backoff::backoff::Backoff as InnerBackoff;

/// Trait to define a RetryStrategy. You can use this trait to define your
/// custom retry strategy.
pub trait RetryStrategy: Debug + Send + Sync {
    /// Maximum number of consecutive restarts before permanently stopping an actor.
    fn max_retries(&self) -> usize;
    /// Wait duration before restarting.
    fn next_backoff(&mut self) -> Option<Duration>;
    /// Called after the actor handled a message successfully.
    fn reset(&mut self) {}
}

/// What the runtime does when a handler fails.
///
/// The parent picks the strategy when it creates the child (see
/// [`Props::with_supervision`](crate::Props::with_supervision)). When nothing is picked,
/// [`Actor::supervision_strategy`](crate::Actor::supervision_strategy) applies, which restarts
/// by default.
#[derive(Debug, Clone)]
pub enum SupervisionStrategy {
    /// Stop the actor.
    Stop,
    /// Replace the failed instance with a fresh one built from its factory.
    Restart(Strategy),
    /// Stop the actor and fail its parent with the same reason.
    Escalate,
}

impl Default for SupervisionStrategy {
    fn default() -> Self {
        SupervisionStrategy::Restart(Strategy::NoInterval(
            NoIntervalStrategy::unlimited(),
        ))
    }
}

/// Built-in retry strategies.
#[derive(Debug, Clone)]
pub enum Strategy {
    NoInterval(NoIntervalStrategy),
    FixedInterval(FixedIntervalStrategy),
    CustomInterval(CustomIntervalStrategy),
    ExponentialBackoff(ExponentialBackoffStrategy),
}

impl RetryStrategy for Strategy {
    fn max_retries(&self) -> usize {
        match self {
            Strategy::NoInterval(s) => s.max_retries(),
            Strategy::FixedInterval(s) => s.max_retries(),
            Strategy::CustomInterval(s) => s.max_retries(),
            Strategy::ExponentialBackoff(s) => s.max_retries(),
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        match self {
            Strategy::NoInterval(s) => s.next_backoff(),
            Strategy::FixedInterval(s) => s.next_backoff(),
            Strategy::CustomInterval(s) => s.next_backoff(),
            Strategy::ExponentialBackoff(s) => s.next_backoff(),
        }
    }

    fn reset(&mut self) {
        match self {
            Strategy::NoInterval(s) => s.reset(),
            Strategy::FixedInterval(s) => s.reset(),
            Strategy::CustomInterval(s) => s.reset(),
            Strategy::ExponentialBackoff(s) => s.reset(),
        }
    }
}

/// A Retry strategy that immediately restarts a failed actor.
#[derive(Debug, Clone, Default)]
pub struct NoIntervalStrategy {
    max_retries: usize,
}

impl NoIntervalStrategy {
    pub fn new(max_retries: usize) -> Self {
        NoIntervalStrategy { max_retries }
    }

    /// Restarts forever.
    pub fn unlimited() -> Self {
        NoIntervalStrategy {
            max_retries: usize::MAX,
        }
    }
}

impl RetryStrategy for NoIntervalStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        None
    }
}

/// A retry strategy that waits a fixed period before restarting.
#[derive(Debug, Clone, Default)]
pub struct FixedIntervalStrategy {
    /// Maximum number of restarts before permanently stopping an actor.
    max_retries: usize,
    /// Wait duration before restarting.
    duration: Duration,
}

impl FixedIntervalStrategy {
    pub fn new(max_retries: usize, duration: Duration) -> Self {
        FixedIntervalStrategy {
            max_retries,
            duration,
        }
    }
}

impl RetryStrategy for FixedIntervalStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        Some(self.duration)
    }
}

/// A retry strategy with a user-defined sequence of waits. One restart per entry.
#[derive(Debug, Clone, Default)]
pub struct CustomIntervalStrategy {
    durations: VecDeque<Duration>,
    pending: VecDeque<Duration>,
}

impl CustomIntervalStrategy {
    pub fn new(durations: VecDeque<Duration>) -> Self {
        CustomIntervalStrategy {
            pending: durations.clone(),
            durations,
        }
    }
}

impl RetryStrategy for CustomIntervalStrategy {
    fn max_retries(&self) -> usize {
        self.durations.len()
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.pending.pop_front()
    }

    fn reset(&mut self) {
        self.pending = self.durations.clone();
    }
}

/// A retry strategy with an exponentially growing wait between restarts.
#[derive(Debug)]
pub struct ExponentialBackoffStrategy {
    /// Maximum number of restarts before permanently stopping an actor.
    max_retries: usize,
    initial: Duration,
    max: Duration,
    inner: backoff::ExponentialBackoff,
}

impl ExponentialBackoffStrategy {
    pub fn new(max_retries: usize) -> Self {
        Self::with_intervals(
            max_retries,
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
    }

    pub fn with_intervals(
        max_retries: usize,
        initial: Duration,
        max: Duration,
    ) -> Self {
        let mut inner = backoff::ExponentialBackoff {
            current_interval: initial,
            initial_interval: initial,
            max_interval: max,
            max_elapsed_time: None,
            ..Default::default()
        };
        inner.reset();
        ExponentialBackoffStrategy {
            max_retries,
            initial,
            max,
            inner,
        }
    }
}

// Each clone starts its own sequence from the initial interval.
impl Clone for ExponentialBackoffStrategy {
    fn clone(&self) -> Self {
        Self::with_intervals(self.max_retries, self.initial, self.max)
    }
}

impl Default for ExponentialBackoffStrategy {
    fn default() -> Self {
        Self::new(10)
    }
}

impl RetryStrategy for ExponentialBackoffStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.inner.next_backoff()
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_default_strategy_restarts_forever() {
        match SupervisionStrategy::default() {
            SupervisionStrategy::Restart(strategy) => {
                assert_eq!(strategy.max_retries(), usize::MAX);
            }
            other => panic!("unexpected default strategy {:?}", other),
        }
    }

    #[test]
    fn test_no_interval_strategy() {
        let mut strategy = NoIntervalStrategy::new(3);
        assert_eq!(strategy.max_retries(), 3);
        assert_eq!(strategy.next_backoff(), None);
    }

    #[test]
    fn test_fixed_interval_strategy() {
        let mut strategy =
            FixedIntervalStrategy::new(3, Duration::from_secs(1));
        assert_eq!(strategy.max_retries(), 3);
        assert_eq!(strategy.next_backoff(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_custom_interval_strategy_resets() {
        let mut strategy = Strategy::CustomInterval(CustomIntervalStrategy::new(
            VecDeque::from([Duration::from_millis(10), Duration::from_millis(20)]),
        ));
        assert_eq!(strategy.max_retries(), 2);
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(10)));
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(20)));
        assert_eq!(strategy.next_backoff(), None);
        strategy.reset();
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_exponential_backoff_strategy() {
        let mut strategy = ExponentialBackoffStrategy::with_intervals(
            3,
            Duration::from_millis(10),
            Duration::from_millis(50),
        );
        assert_eq!(strategy.max_retries(), 3);
        for _ in 0..10 {
            let wait = strategy.next_backoff().unwrap();
            assert!(wait <= Duration::from_millis(75));
        }
    }
}
