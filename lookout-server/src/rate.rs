//! Per-session token-bucket rate limiting.
//!
//! Classic token bucket: a bucket refills at `per_minute / 60` tokens per
//! second up to `burst`, and a request spends one token or is refused.
//! Buckets are keyed by session token (or account name for login attempts),
//! so one noisy client cannot starve the rest.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    burst: f64,
    last: Instant,
}

impl Bucket {
    fn new(burst: f64) -> Self {
        Self {
            tokens: burst,
            burst,
            last: Instant::now(),
        }
    }

    /// Refill for elapsed time, then try to spend one token.
    fn try_take(&mut self, qps: f64, now: Instant) -> bool {
        let dt = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        self.tokens = (self.tokens + dt * qps).min(self.burst);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a request under `key` is allowed right now.
    pub fn allow(&self, key: &str, per_minute: u32, burst: u32) -> bool {
        // A zero rate would never refill; treat it as "no limit configured".
        if per_minute == 0 {
            return true;
        }
        let qps = f64::from(per_minute) / 60.0;
        let mut buckets = self.buckets.lock().expect("rate limiter lock poisoned");
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::new(f64::from(burst.max(1))));
        bucket.try_take(qps, Instant::now())
    }
}
