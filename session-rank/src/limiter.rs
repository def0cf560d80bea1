//! Fixed-delay rate limiter shared by every candle source call.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Consecutive [`acquire`](RateLimiter::acquire) calls return at least `interval` apart.
///
/// Each caller reserves the next free slot under the lock, then sleeps outside it, so
/// concurrent workers queue up in reservation order.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Interval sized from the venue's advertised rate limit, never below `floor`.
    pub fn from_advertised(advertised: Duration, floor: Duration) -> Self {
        Self::new(advertised.max(floor))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next free slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock();
            let now = Instant::now();
            let slot = next_slot.map_or(now, |next| next.max(now));
            *next_slot = Some(slot + self.interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}
