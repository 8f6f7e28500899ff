use std::time::Duration;

use tokio::time::Instant;

/// Per-session admission policy.
#[derive(Clone, Copy, Debug)]
pub struct SessionLimits {
    /// Tokens restored per second.
    pub rate_per_sec: f64,
    /// Bucket capacity (burst size).
    pub burst: u32,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            rate_per_sec: 10.0,
            burst: 20,
        }
    }
}

/// Wait-then-admit token bucket.
///
/// Refill is computed lazily from elapsed time at each call; there is no
/// background timer. A caller short on tokens is suspended, never rejected.
/// The `&mut self` receiver makes exclusive ownership a compile-time fact:
/// a limiter belongs to exactly one session and cannot be shared between
/// connection tasks.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    tokens: f64,
    updated: Instant,
}

impl RateLimiter {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            rate: limits.rate_per_sec,
            capacity: f64::from(limits.burst),
            tokens: f64::from(limits.burst),
            updated: Instant::now(),
        }
    }

    /// Consume `cost` tokens, suspending the calling task until enough have
    /// accumulated. Invariant: `tokens` stays within `[0, capacity]`.
    pub async fn take(&mut self, cost: u32) {
        let cost = f64::from(cost);
        let now = Instant::now();
        let elapsed = now.duration_since(self.updated).as_secs_f64();
        self.updated = now;
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);

        if self.tokens >= cost {
            self.tokens -= cost;
            return;
        }

        let wait = ((cost - self.tokens) / self.rate).max(0.0);
        tokio::time::sleep(Duration::from_secs_f64(wait)).await;
        self.tokens = 0.0;
    }

    /// Current token count. Refill only happens inside `take`, so this is
    /// the count as of the last admission check.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }
}
