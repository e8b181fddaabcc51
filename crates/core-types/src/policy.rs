//! Retry scheduling.

use std::time::Duration;

/// How a failing operation is retried.
///
/// Two shapes exist:
/// - **bounded**: finite retries with exponential growth, used at startup so
///   a truly absent device fails fast;
/// - **unbounded**: infinite retries at a constant delay, used mid-session
///   where an outage may last arbitrarily long and the wait must not grow
///   without limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries permitted after the initial attempt. `None` retries forever.
    pub max_retries: Option<u32>,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Growth factor applied per retry. 1 means constant delay.
    pub multiplier: u32,
}

impl RetryPolicy {
    pub fn bounded(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries: Some(max_retries),
            initial_delay,
            multiplier: 2,
        }
    }

    pub fn unbounded(delay: Duration) -> Self {
        Self {
            max_retries: None,
            initial_delay: delay,
            multiplier: 1,
        }
    }

    /// Whether another retry is allowed after `retries` have already failed.
    pub fn allows_retry(&self, retries: u32) -> bool {
        self.max_retries.map_or(true, |max| retries < max)
    }

    /// Delay before retry `retry` (0-indexed): `initial * multiplier^retry`.
    ///
    /// The exponent is clamped so a runaway attempt counter saturates
    /// instead of overflowing.
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        if self.multiplier <= 1 {
            return self.initial_delay;
        }
        let base_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        let factor = u64::from(self.multiplier).saturating_pow(retry.min(30));
        Duration::from_millis(base_ms.saturating_mul(factor))
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_delays_double() {
        let policy = RetryPolicy::bounded(5, Duration::from_millis(2000));

        // Retry 0: 2000ms, retry 1: 4000ms, ... retry 4: 32000ms.
        assert_eq!(policy.delay_before_retry(0), Duration::from_millis(2000));
        assert_eq!(policy.delay_before_retry(1), Duration::from_millis(4000));
        assert_eq!(policy.delay_before_retry(2), Duration::from_millis(8000));
        assert_eq!(policy.delay_before_retry(3), Duration::from_millis(16000));
        assert_eq!(policy.delay_before_retry(4), Duration::from_millis(32000));
    }

    #[test]
    fn test_unbounded_delay_is_constant() {
        let policy = RetryPolicy::unbounded(Duration::from_millis(5000));

        for retry in [0, 1, 10, 1000, u32::MAX] {
            assert_eq!(policy.delay_before_retry(retry), Duration::from_millis(5000));
        }
    }

    #[test]
    fn test_retry_budget() {
        let policy = RetryPolicy::bounded(5, Duration::from_millis(100));
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(4));
        assert!(!policy.allows_retry(5));

        let policy = RetryPolicy::unbounded(Duration::from_millis(100));
        assert!(policy.allows_retry(u32::MAX));
    }

    #[test]
    fn test_delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::bounded(200, Duration::from_millis(100));
        let delay = policy.delay_before_retry(100);
        assert!(delay > Duration::ZERO);
        // Clamped exponent: same value past the cap.
        assert_eq!(delay, policy.delay_before_retry(31));
    }
}
