//! Retry policy and the per-item attempt state machine.
//!
//! The drain loop never reasons about counters inline; it asks `plan_attempt`
//! what to do with an item and applies the answer. Transitions:
//! pending → attempting → (done | retrying | dead).

use std::time::Duration;

/// Message recorded on a dead-lettered item.
pub const EXHAUSTED_MESSAGE: &str = "max retries exceeded";

/// Bounds for automatic redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before an item is dead-lettered.
    pub max_attempts: u32,
    /// First backoff delay; doubles per subsequent attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// Fast policy for tests: same bound, millisecond delays.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    pub fn retry_eligible(&self, retry_count: u32) -> bool {
        retry_count < self.max_attempts
    }
}

/// What the drain loop should do with one queued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPlan {
    /// Retry budget exhausted; mark dead, do not send.
    DeadLetter,
    /// Sleep this long, then attempt.
    AfterBackoff(Duration),
    /// First attempt; send right away.
    Immediate,
}

/// Plan one delivery attempt given how many have already failed.
///
/// Backoff is `base_delay * 2^(retry_count - 1)`: with the default policy the
/// second attempt waits 2s, the third 4s.
pub fn plan_attempt(retry_count: u32, policy: &RetryPolicy) -> AttemptPlan {
    if retry_count >= policy.max_attempts {
        return AttemptPlan::DeadLetter;
    }
    if retry_count > 0 {
        let factor = 2u32.saturating_pow(retry_count - 1);
        return AttemptPlan::AfterBackoff(policy.base_delay * factor);
    }
    AttemptPlan::Immediate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_is_immediate() {
        let policy = RetryPolicy::default();
        assert_eq!(plan_attempt(0, &policy), AttemptPlan::Immediate);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(2000),
        };
        assert_eq!(plan_attempt(1, &policy), AttemptPlan::AfterBackoff(Duration::from_millis(2000)));
        assert_eq!(plan_attempt(2, &policy), AttemptPlan::AfterBackoff(Duration::from_millis(4000)));
        assert_eq!(plan_attempt(3, &policy), AttemptPlan::AfterBackoff(Duration::from_millis(8000)));
    }

    #[test]
    fn test_dead_letter_at_bound() {
        let policy = RetryPolicy::default();
        assert_eq!(plan_attempt(3, &policy), AttemptPlan::DeadLetter);
        assert_eq!(plan_attempt(7, &policy), AttemptPlan::DeadLetter);
        assert!(!policy.retry_eligible(3));
        assert!(policy.retry_eligible(2));
    }
}
