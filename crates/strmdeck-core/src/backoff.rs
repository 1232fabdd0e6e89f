// ── Exponential backoff ──
//
// Pure delay computation shared by the reconnect scheduler and the
// command retry loop. No jitter: schedules are exact and testable.

use std::time::Duration;

/// `delay(n) = base * 2^(n-1)`, optionally capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Option<Duration>,
}

impl Backoff {
    pub const fn new(base: Duration, cap: Option<Duration>) -> Self {
        Self { base, cap }
    }

    /// Push-channel reconnects: 1s, 2s, 4s, ... capped at 30s.
    pub const fn reconnect() -> Self {
        Self::new(Duration::from_secs(1), Some(Duration::from_secs(30)))
    }

    /// Command retries: 1s, 2s, ... uncapped.
    pub const fn retry() -> Self {
        Self::new(Duration::from_secs(1), None)
    }

    /// Delay before the `attempt`-th retry (1-based). Attempt 0 is treated
    /// as 1; overflow saturates instead of wrapping.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        let raw = self.base.saturating_mul(factor);
        match self.cap {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::reconnect()
    }
}
