//! Bounded retry schedule for page fetches.
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::FetchErrorKind;

/// Exponential backoff without jitter, so the schedule can be asserted exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per page, the first one included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Extra multiplier applied to the delay when the server rate limited us.
    pub rate_limit_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            rate_limit_factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempt` (1-based) failed with `kind`.
    #[inline]
    pub const fn should_retry(&self, kind: FetchErrorKind, attempt: u32) -> bool {
        kind.is_retryable() && attempt < self.max_attempts
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// `base * 2^(attempt - 1)`, times `rate_limit_factor` for rate limits, capped at `max_delay`.
    pub fn delay_for(&self, kind: FetchErrorKind, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let mut delay = self.base_delay_ms.saturating_mul(1u64 << exponent);

        if kind == FetchErrorKind::RateLimited {
            delay = delay.saturating_mul(u64::from(self.rate_limit_factor.max(1)));
        }

        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}
