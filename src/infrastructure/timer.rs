use crate::types::{MAX_BACKOFF_DELAY, MIN_RECONNECT_INTERVAL};
use std::time::Duration;

/// Exponential backoff policy for reconnect attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retrying after attempt `attempt` (1-based).
    ///
    /// `base * 2^(attempt - 1)`, capped at `max`. Attempt 0 is treated as 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 2u64.saturating_pow(exponent);
        let millis = (self.base.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(millis).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(MIN_RECONNECT_INTERVAL),
            Duration::from_millis(MAX_BACKOFF_DELAY),
        )
    }
}

/// Backoff with the default reconnect constants
pub fn backoff(attempt: u32) -> Duration {
    Backoff::default().delay(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let delays: Vec<u64> = (1..=5).map(|n| backoff(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![5000, 10000, 20000, 40000, 60000]);
    }

    #[test]
    fn test_cap_holds() {
        assert_eq!(backoff(6), Duration::from_millis(60000));
        assert_eq!(backoff(64), Duration::from_millis(60000));
        assert_eq!(backoff(u32::MAX), Duration::from_millis(60000));
    }

    #[test]
    fn test_zero_attempt_is_first_attempt() {
        assert_eq!(backoff(0), backoff(1));
    }

    #[test]
    fn test_custom_policy() {
        let policy = Backoff::new(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(350));
    }
}
