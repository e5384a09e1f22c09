//! Retry interval math (§4.2): `intervalForRetry(opts, attempt) = min(base *
//! 2^attempt, cap)`. 4xx-class failures are never retried — callers check
//! that themselves (this module only computes the delay).

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryOptions {
    pub base_ms: u64,
    pub cap_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            base_ms: 500,
            cap_ms: 30_000,
        }
    }
}

/// `attempt` is 0-indexed (first retry uses `attempt = 0`).
pub fn interval_for_retry(opts: RetryOptions, attempt: u32) -> Duration {
    let scaled = opts.base_ms.saturating_mul(1u64 << attempt.min(32));
    Duration::from_millis(scaled.min(opts.cap_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_each_attempt_until_capped() {
        let opts = RetryOptions {
            base_ms: 100,
            cap_ms: 1_000,
        };
        assert_eq!(interval_for_retry(opts, 0), Duration::from_millis(100));
        assert_eq!(interval_for_retry(opts, 1), Duration::from_millis(200));
        assert_eq!(interval_for_retry(opts, 2), Duration::from_millis(400));
        assert_eq!(interval_for_retry(opts, 10), Duration::from_millis(1_000));
    }

    #[test]
    fn never_overflows_on_large_attempt() {
        let opts = RetryOptions::default();
        let d = interval_for_retry(opts, 10_000);
        assert_eq!(d, Duration::from_millis(opts.cap_ms));
    }
}
