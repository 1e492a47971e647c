//! Bounded retry policy for fiscalization attempts.

use std::time::Duration;

/// Default number of attempts per fiscalization request.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default delay between failed attempts, in milliseconds.
pub const DEFAULT_RETRY_TIMEOUT_MS: u64 = 2000;

/// Retry policy for one fiscalization attempt set.
///
/// Built from facility settings; missing or nonsensical values fall back
/// to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before giving up (at least 1).
    pub max_attempts: u32,
    /// Delay between failed attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_COUNT,
            backoff: Duration::from_millis(DEFAULT_RETRY_TIMEOUT_MS),
        }
    }
}

impl RetryPolicy {
    /// Builds a policy from facility settings.
    #[must_use]
    pub fn from_settings(retry_count: Option<i32>, timeout_ms: Option<i64>) -> Self {
        let max_attempts = match retry_count {
            Some(n) if n > 0 => n.unsigned_abs(),
            _ => DEFAULT_RETRY_COUNT,
        };
        let backoff_ms = match timeout_ms {
            Some(ms) if ms > 0 => ms.unsigned_abs(),
            _ => DEFAULT_RETRY_TIMEOUT_MS,
        };

        Self {
            max_attempts,
            backoff: Duration::from_millis(backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(2000));
    }

    #[test]
    fn test_from_facility_settings() {
        let policy = RetryPolicy::from_settings(Some(5), Some(500));
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_settings_fall_back() {
        let policy = RetryPolicy::from_settings(Some(0), Some(-10));
        assert_eq!(policy, RetryPolicy::default());

        let policy = RetryPolicy::from_settings(None, None);
        assert_eq!(policy, RetryPolicy::default());
    }
}
