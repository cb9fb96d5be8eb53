//! Pacing between history fetches.
//!
//! The history provider rate-limits aggressively and silently, so the
//! evaluation loop keeps a minimum quiet interval between the end of one
//! call and the start of the next.

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::time::Duration;

pub trait Pacer {
    /// Block until the next external call may be made.
    fn pace(&mut self);

    /// Mark that an external call has just finished.
    fn record_call(&mut self) {}
}

/// Waits at least `interval` after each recorded call before letting the
/// next one through. Nothing waits before the first recorded call.
pub struct MinIntervalPacer {
    quota: Option<Quota>,
    limiter: Option<DefaultDirectRateLimiter>,
    clock: DefaultClock,
}

impl MinIntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            quota: Quota::with_period(interval),
            limiter: None,
            clock: DefaultClock::default(),
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }
}

impl Pacer for MinIntervalPacer {
    fn pace(&mut self) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        while let Err(not_until) = limiter.check() {
            let wait = not_until.wait_time_from(self.clock.now());
            tracing::trace!(wait_ms = wait.as_millis() as u64, "pacing history fetch");
            std::thread::sleep(wait);
        }
    }

    fn record_call(&mut self) {
        // A fresh single-cell limiter spends its cell here, so the next
        // cell becomes available one interval after the call finished.
        if let Some(quota) = self.quota {
            let limiter = RateLimiter::direct(quota);
            let _ = limiter.check();
            self.limiter = Some(limiter);
        }
    }
}

/// No waiting at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn pace(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn first_call_does_not_wait() {
        let mut pacer = MinIntervalPacer::from_millis(10_000);
        let start = Instant::now();
        pacer.pace();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn waits_for_interval_after_recorded_call() {
        let mut pacer = MinIntervalPacer::from_millis(40);
        pacer.pace();
        pacer.record_call();
        let start = Instant::now();
        pacer.pace();
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn interval_counts_from_end_of_slow_call() {
        let mut pacer = MinIntervalPacer::from_millis(40);
        pacer.pace();
        std::thread::sleep(Duration::from_millis(60));
        pacer.record_call();
        let start = Instant::now();
        pacer.pace();
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn elapsed_interval_means_no_wait() {
        let mut pacer = MinIntervalPacer::from_millis(20);
        pacer.record_call();
        std::thread::sleep(Duration::from_millis(40));
        let start = Instant::now();
        pacer.pace();
        assert!(start.elapsed() < Duration::from_millis(15));
    }

    #[test]
    fn zero_interval_never_waits() {
        let mut pacer = MinIntervalPacer::from_millis(0);
        let start = Instant::now();
        for _ in 0..50 {
            pacer.pace();
            pacer.record_call();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn no_pacing_returns_immediately() {
        let mut pacer = NoPacing;
        let start = Instant::now();
        for _ in 0..100 {
            pacer.pace();
            pacer.record_call();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
