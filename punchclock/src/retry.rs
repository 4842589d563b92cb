use std::time::Duration;

/// Bounded retry parameters shared by every locate call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Full passes over the candidate strategy list (always at least 1)
    pub max_attempts: u32,
    /// Pause between two failed passes
    pub backoff: Duration,
    /// How long each single strategy may wait for its ready condition
    pub per_attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
            per_attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration, per_attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            per_attempt_timeout,
        }
    }

    /// A single pass with no backoff.
    pub fn once(per_attempt_timeout: Duration) -> Self {
        Self::new(1, Duration::ZERO, per_attempt_timeout)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_per_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.per_attempt_timeout = timeout;
        self
    }

    /// Attempts are numbered from 1; no backoff follows the last one.
    pub fn should_back_off(&self, attempt: u32) -> bool {
        attempt < self.max_attempts && !self.backoff.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_attempts_is_clamped() {
        let policy = RetryPolicy::new(0, Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn test_no_backoff_after_last_attempt() {
        let policy = RetryPolicy::default();
        assert!(policy.should_back_off(1));
        assert!(policy.should_back_off(2));
        assert!(!policy.should_back_off(3));
        assert!(!RetryPolicy::once(Duration::from_secs(1)).should_back_off(1));
    }
}
