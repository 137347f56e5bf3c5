//! Keyed rate limiter registry: one limiter per API key for the classic
//! HTTP/stdio gateway, or a single process-wide limiter for the bridge
//! (call `get` with the same key every time, e.g. `"_bridge"`).

use crate::ratelimit::RateLimiter;
use dashmap::DashMap;
use std::time::Duration;

pub struct RateLimiterRegistry {
    limit: usize,
    window: Duration,
    limiters: DashMap<String, RateLimiter>,
}

impl RateLimiterRegistry {
    pub fn new(limit: usize, window: Duration) -> Self {
        RateLimiterRegistry {
            limit,
            window,
            limiters: DashMap::new(),
        }
    }

    /// Checks and records a call for `key`, lazily creating its limiter.
    pub fn allow(&self, key: &str) -> bool {
        if !self.limiters.contains_key(key) {
            self.limiters
                .entry(key.to_string())
                .or_insert_with(|| RateLimiter::new(self.limit, self.window));
        }
        self.limiters.get(key).expect("just inserted").allow()
    }
}
