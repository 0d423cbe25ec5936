//! Requests-per-second pacing shared by all workers.
//!
//! Fixed minimum spacing between request starts: each caller reserves the
//! next free slot under the lock and sleeps outside it, so bursts are spread
//! out instead of rejected.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::bounded_secs;
use crate::control::PoolControl;

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `None` for a non-positive or non-finite rate. Very small rates are
    /// capped at one request per `MAX_WAIT_SECS`.
    pub fn per_second(tps: f64) -> Option<Self> {
        if !(tps.is_finite() && tps > 0.0) {
            return None;
        }
        Some(Self::with_interval(bounded_secs(1.0 / tps, 0.0)))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next start slot; returns how long to wait for it.
    pub fn reserve(&self) -> Duration {
        let now = Instant::now();
        let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = match *next {
            Some(t) if t > now => t,
            _ => now,
        };
        *next = Some(slot + self.interval);
        slot - now
    }

    /// Wait for a slot. Returns false if the pool was stopped meanwhile.
    pub fn acquire(&self, control: &PoolControl) -> bool {
        let wait = self.reserve();
        wait.is_zero() || control.sleep(wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rates_disable_limiting() {
        assert!(RateLimiter::per_second(0.0).is_none());
        assert!(RateLimiter::per_second(-1.0).is_none());
        assert!(RateLimiter::per_second(f64::NAN).is_none());
        assert_eq!(
            RateLimiter::per_second(4.0).unwrap().interval(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn tiny_rates_are_capped() {
        let day = Duration::from_secs(86_400);
        assert_eq!(RateLimiter::per_second(1e-30).unwrap().interval(), day);
        assert_eq!(RateLimiter::per_second(f64::MIN_POSITIVE / 4.0).unwrap().interval(), day);
    }

    #[test]
    fn slots_are_spaced() {
        let r = RateLimiter::with_interval(Duration::from_millis(100));
        assert_eq!(r.reserve(), Duration::ZERO);
        let second = r.reserve();
        let third = r.reserve();
        assert!(second > Duration::from_millis(80) && second <= Duration::from_millis(100));
        assert!(third > Duration::from_millis(180) && third <= Duration::from_millis(200));
    }

    #[test]
    fn acquire_paces_callers() {
        let r = RateLimiter::with_interval(Duration::from_millis(40));
        let c = PoolControl::new();
        let start = Instant::now();
        for _ in 0..4 {
            assert!(r.acquire(&c));
        }
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn acquire_gives_up_when_stopped() {
        let r = RateLimiter::with_interval(Duration::from_secs(60));
        let c = PoolControl::new();
        assert!(r.acquire(&c));
        c.request_stop();
        assert!(!r.acquire(&c));
    }
}
