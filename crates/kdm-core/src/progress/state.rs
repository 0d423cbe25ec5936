//! Per-transfer and per-batch bookkeeping behind the aggregator lock.

use std::time::{Duration, Instant};

/// Minimum spacing between rate samples; faster updates accumulate.
const SAMPLE_WINDOW: Duration = Duration::from_millis(200);
/// Weight of the newest sample in the smoothed rate.
const RATE_ALPHA: f64 = 0.5;

/// Terminal state of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Completed,
    Failed,
}

/// Live progress record for one in-flight or recently finished download.
#[derive(Debug, Clone)]
pub(super) struct TransferState {
    pub label: String,
    pub total: Option<u64>,
    pub done: u64,
    /// Smoothed bytes per second.
    pub rate: f64,
    pub status: Option<TransferStatus>,
    pub finished_at: Option<Instant>,
    sample_at: Instant,
    sample_bytes: u64,
}

impl TransferState {
    pub fn new(label: String, total: Option<u64>, now: Instant) -> Self {
        Self {
            label,
            total,
            done: 0,
            rate: 0.0,
            status: None,
            finished_at: None,
            sample_at: now,
            sample_bytes: 0,
        }
    }

    /// Add `delta` bytes and refresh the rate from the previous sample.
    pub fn advance(&mut self, delta: u64, now: Instant) {
        self.done = self.done.saturating_add(delta);
        let elapsed = now.saturating_duration_since(self.sample_at);
        if elapsed < SAMPLE_WINDOW {
            return;
        }
        let instant = (self.done - self.sample_bytes) as f64 / elapsed.as_secs_f64();
        self.rate = if self.rate == 0.0 {
            instant
        } else {
            RATE_ALPHA * instant + (1.0 - RATE_ALPHA) * self.rate
        };
        self.sample_at = now;
        self.sample_bytes = self.done;
    }

    /// Resumed bytes: counted as done without contributing to the rate.
    pub fn skip_ahead(&mut self, bytes: u64) {
        self.done = self.done.saturating_add(bytes);
        self.sample_bytes = self.done;
    }

    pub fn finish(&mut self, status: TransferStatus, now: Instant) {
        if self.status.is_none() {
            self.status = Some(status);
            self.finished_at = Some(now);
            self.rate = 0.0;
        }
    }

    pub fn expired(&self, linger: Duration, now: Instant) -> bool {
        self.finished_at
            .is_some_and(|t| now.saturating_duration_since(t) >= linger)
    }
}

/// Job counters for the current batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub running: u64,
    pub peak_running: u64,
}

impl Counters {
    pub fn resolved(&self) -> u64 {
        self.completed + self.failed + self.skipped
    }

    pub fn waiting(&self) -> u64 {
        self.total.saturating_sub(self.resolved() + self.running)
    }

    /// Room left before `resolved` reaches `total`.
    pub(super) fn headroom(&self) -> u64 {
        self.total.saturating_sub(self.resolved())
    }

    /// Grow the total. A finished batch (everything resolved, nothing running)
    /// is replaced by a fresh one; the denominator never shrinks mid-batch.
    pub(super) fn add_total(&mut self, n: u64) {
        let idle = self.total > 0 && self.resolved() >= self.total && self.running == 0;
        if idle {
            *self = Counters {
                total: n,
                peak_running: self.peak_running,
                ..Counters::default()
            };
        } else {
            self.total += n;
        }
    }
}
