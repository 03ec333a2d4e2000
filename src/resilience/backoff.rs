//! Exponential backoff with jitter, and the resubscribe policy built on it.

use rand::Rng;
use std::time::Duration;

use crate::config::IngestorConfig;

/// Exponential backoff delay with up to 10% jitter.
///
/// Attempt 1 waits `base_ms`; each further attempt doubles, capped at `max_ms`.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

/// How a subscriber waits between subscription attempts and when it gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResubscribePolicy {
    pub delay: Duration,
    pub max_delay: Duration,
    /// 0 disables the cap.
    pub max_consecutive_failures: u32,
}

impl ResubscribePolicy {
    pub fn from_config(config: &IngestorConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.resubscribe_delay_ms),
            max_delay: Duration::from_millis(config.max_resubscribe_delay_ms.max(config.resubscribe_delay_ms)),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }

    /// Wait before the next attempt after `failures` consecutive failures.
    pub fn delay_for(&self, failures: u32) -> Duration {
        calculate_backoff(
            failures.max(1),
            self.delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        )
    }

    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_consecutive_failures > 0 && failures >= self.max_consecutive_failures
    }
}

impl Default for ResubscribePolicy {
    fn default() -> Self {
        Self::from_config(&IngestorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100 && b1.as_millis() < 110);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000 && max.as_millis() < 1100);

        assert_eq!(calculate_backoff(0, 100, 1000), Duration::ZERO);
    }

    #[test]
    fn test_policy_starts_at_configured_delay() {
        let policy = ResubscribePolicy::default();
        let first = policy.delay_for(1);
        assert!(first >= Duration::from_secs(5) && first < Duration::from_millis(5500));
        // zero failures still waits the base delay
        assert!(policy.delay_for(0) >= Duration::from_secs(5));
        assert!(policy.delay_for(30) < Duration::from_secs(67));
    }

    #[test]
    fn test_policy_cap() {
        let unlimited = ResubscribePolicy::default();
        assert!(!unlimited.exhausted(1000));

        let capped = ResubscribePolicy { max_consecutive_failures: 3, ..unlimited };
        assert!(!capped.exhausted(2));
        assert!(capped.exhausted(3));
    }
}
