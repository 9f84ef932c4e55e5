//! Process-wide politeness budget for external geocoding calls
//!
//! Built once at startup and shared through an `Arc` by every pipeline run.
//! Callers queue on a FIFO `tokio::sync::Mutex` and the head of the queue
//! waits on a `governor` token bucket, so slots are handed out strictly in
//! arrival order. The slot is released as soon as the token is taken; no
//! caller holds the queue lock across the external request itself.

use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use sl_common::{Error, Result};

pub struct RateLimiter {
    bucket: DefaultDirectRateLimiter,
    queue: Mutex<()>,
    requests_per_second: u32,
    burst: u32,
    granted: AtomicU64,
}

impl RateLimiter {
    /// `requests_per_second` sustained, up to `burst` back to back
    pub fn new(requests_per_second: u32, burst: u32) -> Result<Self> {
        let rate = NonZeroU32::new(requests_per_second).ok_or_else(|| {
            Error::Config("rate limiter needs at least 1 request per second".into())
        })?;
        let burst_size = NonZeroU32::new(burst)
            .ok_or_else(|| Error::Config("rate limiter burst must be at least 1".into()))?;

        Ok(Self {
            bucket: DefaultDirectRateLimiter::direct(Quota::per_second(rate).allow_burst(burst_size)),
            queue: Mutex::new(()),
            requests_per_second,
            burst,
            granted: AtomicU64::new(0),
        })
    }

    /// Wait for the next slot, first come first served
    pub async fn acquire(&self) {
        let started = Instant::now();
        let _turn = self.queue.lock().await;
        self.bucket.until_ready().await;

        let waited = started.elapsed();
        let n = self.granted.fetch_add(1, Ordering::Relaxed) + 1;
        if waited > Duration::from_millis(5) {
            debug!(waited_ms = waited.as_millis() as u64, granted = n, "Rate limiting: slot granted after wait");
        }
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Slots handed out since construction
    pub fn granted(&self) -> u64 {
        self.granted.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .field("burst", &self.burst)
            .field("granted", &self.granted())
            .finish()
    }
}
