//! Rate limiting for latest-value callbacks
//!
//! The limiter does not queue or delay anything: a call either passes the
//! gate or is skipped. Skipped values are superseded by the next tick.

use std::time::Duration;

use crate::Timestamp;

/// Minimum-interval gate
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Option<Timestamp>,
    passed: u64,
    skipped: u64,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        RateLimiter {
            min_interval,
            last: None,
            passed: 0,
            skipped: 0,
        }
    }

    /// Gate for a target frequency in Hz
    pub fn per_second(hz: u32) -> Self {
        Self::new(Duration::from_secs(1) / hz.max(1))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns true (and records `now`) if at least `min_interval` elapsed
    /// since the last accepted call
    pub fn try_acquire(&mut self, now: Timestamp) -> bool {
        let ready = match self.last {
            None => true,
            Some(last) => now.saturating_since(last) >= self.min_interval,
        };

        if ready {
            self.last = Some(now);
            self.passed += 1;
        } else {
            self.skipped += 1;
        }
        ready
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn passed(&self) -> u64 {
        self.passed
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
