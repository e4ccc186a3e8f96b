//! Bounded retry with capped exponential backoff for conditional writes.

use std::time::Duration;

/// How often and how patiently a conflicting conditional write is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total write attempts, including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn runner(&self) -> RetryPolicyRunner {
        RetryPolicyRunner::new(*self)
    }
}

/// Decision after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    RetryAfter(Duration),
    GiveUp,
}

/// Backoff sequence derived from a [`RetryPolicy`].
///
/// Call [`next_outcome`](Self::next_outcome) once per failed attempt.
#[derive(Debug)]
pub struct RetryPolicyRunner {
    policy: RetryPolicy,
    failures: u32,
    backoff: Duration,
}

impl RetryPolicyRunner {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            backoff: policy.initial_backoff,
            failures: 0,
            policy,
        }
    }

    pub fn next_outcome(&mut self) -> RetryOutcome {
        self.failures += 1;
        if self.failures >= self.policy.max_attempts {
            return RetryOutcome::GiveUp;
        }
        let delay = self.backoff;
        self.backoff = std::cmp::min(self.backoff * 2, self.policy.max_backoff);
        RetryOutcome::RetryAfter(delay)
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
