use crate::error_code::FailureClass;
use std::time::Duration;

/// Internal decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Retry { delay: Duration },
    /// Retryable failure, but no attempts left. The backoff still applies.
    Exhausted { delay: Duration },
    /// Permanent failure; stop now.
    Abort,
}

/// Bounded retry with exponential backoff.
///
/// Attempt `i` (0-based) that fails with a rotating status waits `base_delay * 2^i`,
/// including the last one, so exhausting `n` attempts costs `base_delay * (2^n - 1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on attempts; the effective bound is `min(pool size, max_attempts)`.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Attempts allowed for a pool of `pool_size` credentials. Never below 1.
    pub fn attempts_for(&self, pool_size: usize) -> u32 {
        let pool = u32::try_from(pool_size).unwrap_or(u32::MAX);
        pool.min(self.max_attempts).max(1)
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Worst-case added latency from backoff for `attempts` attempts.
    pub fn worst_case_backoff(&self, attempts: u32) -> Duration {
        (0..attempts).map(|i| self.backoff_delay(i)).sum()
    }

    /// Decide what to do after attempt `attempt` (0-based) failed with `class`.
    pub(crate) fn decide(&self, class: FailureClass, attempt: u32, max_attempts: u32) -> Decision {
        if !class.retryable() {
            return Decision::Abort;
        }
        let delay = self.backoff_delay(attempt);
        if attempt + 1 >= max_attempts {
            return Decision::Exhausted { delay };
        }
        Decision::Retry { delay }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_bounded_by_pool_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts_for(1), 1);
        assert_eq!(policy.attempts_for(2), 2);
        assert_eq!(policy.attempts_for(5), 3);
        assert_eq!(policy.attempts_for(0), 1);
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(4000));
        assert_eq!(policy.backoff_delay(40), Duration::from_secs(30));
        assert_eq!(policy.worst_case_backoff(3), Duration::from_millis(7000));
        assert_eq!(policy.worst_case_backoff(1), Duration::from_millis(1000));
    }

    #[test]
    fn test_decisions() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(FailureClass::RateLimited, 0, 3),
            Decision::Retry { delay: Duration::from_millis(1000) }
        );
        assert_eq!(
            policy.decide(FailureClass::Unauthenticated, 2, 3),
            Decision::Exhausted { delay: Duration::from_millis(4000) }
        );
        assert_eq!(policy.decide(FailureClass::InvalidRequest, 0, 3), Decision::Abort);
        assert_eq!(policy.decide(FailureClass::ServerError, 0, 3), Decision::Abort);
    }
}
