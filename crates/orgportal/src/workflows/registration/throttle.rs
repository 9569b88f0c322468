use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::config::ThrottleConfig;

// Largest window chrono can hold without overflowing.
const MAX_WINDOW_SECS: i64 = i64::MAX / 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("too many attempts, retry in {retry_after_secs}s")]
pub struct Throttled {
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: DateTime<Utc>,
    attempts: u32,
}

/// Fixed-window attempt counter keyed by caller (user id or address).
#[derive(Debug)]
pub struct AttemptLimiter {
    max_attempts: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl AttemptLimiter {
    pub fn new(config: ThrottleConfig) -> Self {
        let window_secs = i64::try_from(config.window_secs).unwrap_or(i64::MAX);
        Self {
            max_attempts: config.max_attempts.max(1),
            window: Duration::seconds(window_secs.clamp(1, MAX_WINDOW_SECS)),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one attempt for `key`, refusing it once the budget is spent.
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> Result<(), Throttled> {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        windows.retain(|_, window| now - window.opened_at < self.window);
        let entry = windows.entry(key.to_string()).or_insert(Window {
            opened_at: now,
            attempts: 0,
        });

        if entry.attempts >= self.max_attempts {
            let elapsed = (now - entry.opened_at).max(Duration::zero());
            let remaining = (self.window - elapsed).num_seconds().max(1);
            return Err(Throttled {
                retry_after_secs: remaining as u64,
            });
        }

        entry.attempts += 1;
        Ok(())
    }
}

impl Default for AttemptLimiter {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_760_000_000 + seconds, 0).expect("valid timestamp")
    }

    impl AttemptLimiter {
        fn tracked(&self) -> usize {
            self.windows
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .len()
        }
    }

    fn limiter() -> AttemptLimiter {
        AttemptLimiter::new(ThrottleConfig {
            max_attempts: 2,
            window_secs: 60,
        })
    }

    #[test]
    fn refuses_attempts_beyond_budget_until_window_rolls() {
        let limiter = limiter();
        assert!(limiter.check("user:7", at(0)).is_ok());
        assert!(limiter.check("user:7", at(10)).is_ok());
        assert_eq!(
            limiter.check("user:7", at(20)),
            Err(Throttled {
                retry_after_secs: 40
            })
        );
        assert!(limiter.check("user:7", at(60)).is_ok());
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = limiter();
        limiter.check("user:1", at(0)).expect("first");
        limiter.check("user:1", at(1)).expect("second");
        assert!(limiter.check("user:2", at(2)).is_ok());
        assert!(limiter.check("user:1", at(3)).is_err());
        assert!(limiter.check("user:2", at(4)).is_ok());
    }

    #[test]
    fn expired_windows_are_dropped() {
        let limiter = limiter();
        for user in 0..50 {
            limiter.check(&format!("user:{user}"), at(0)).expect("allowed");
        }
        assert_eq!(limiter.tracked(), 50);
        limiter.check("user:late", at(61)).expect("allowed");
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn huge_window_is_clamped_instead_of_panicking() {
        let limiter = AttemptLimiter::new(ThrottleConfig {
            max_attempts: 1,
            window_secs: 100_000_000_000_000_000,
        });
        limiter.check("user:9", at(0)).expect("first");
        let throttled = limiter.check("user:9", at(1)).expect_err("budget spent");
        assert!(throttled.retry_after_secs > 1_000_000_000);
    }
}
