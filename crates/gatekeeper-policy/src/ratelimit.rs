//! Sliding-window rate limiter (spec §4.8), grounded on the ring-buffer
//! shape of `turbomcp-auth::rate_limit::RateLimiter` but simplified to the
//! spec's literal algorithm: a fixed-size ring of monotonic timestamps,
//! an O(limit) scan per `allow()` call.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

struct RingState {
    buffer: Vec<Option<Instant>>,
    head: usize,
}

/// One sliding-window limiter: at most `limit` calls accepted in any
/// trailing `window` of time.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    state: Mutex<RingState>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        RateLimiter {
            limit,
            window,
            state: Mutex::new(RingState {
                buffer: vec![None; limit.max(1)],
                head: 0,
            }),
        }
    }

    /// Returns `true` if the call is admitted, recording it; `false` if
    /// the window is already at capacity.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        let window = self.window;
        let valid = state
            .buffer
            .iter()
            .filter(|slot| match slot {
                Some(ts) => now.duration_since(*ts) < window,
                None => false,
            })
            .count();
        if valid >= self.limit {
            return false;
        }
        let head = state.head;
        state.buffer[head] = Some(now);
        state.head = (head + 1) % state.buffer.len();
        true
    }
}
