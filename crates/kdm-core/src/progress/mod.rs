//! Progress aggregation for concurrent transfers.
//!
//! `ProgressAggregator` is the one place workers report to: per-transfer
//! byte counts plus the batch job counters. All methods lock internally, so it
//! is shared as `Arc<ProgressAggregator>` with no external synchronization.
//! Transfers are kept in creation order; a line never moves because another
//! transfer updated. Finished transfers linger briefly, then are evicted.

mod display;
mod render;
mod state;

pub use display::Display;
pub use render::{format_bytes, format_rate, overall_line, transfer_line};
pub use state::{Counters, TransferStatus};

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use state::TransferState;

use crate::job::JobState;

/// Handle to one registered transfer. Ordered by registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransferId(pub(crate) u64);

/// Read-only copy of one transfer for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSnapshot {
    pub id: TransferId,
    pub label: String,
    pub total: Option<u64>,
    pub done: u64,
    pub rate: f64,
    pub status: Option<TransferStatus>,
}

/// Consistent view of counters and transfers taken under one lock.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub counters: Counters,
    /// Sum of the rates of unfinished transfers, bytes per second.
    pub throughput: f64,
    /// In creation order.
    pub transfers: Vec<TransferSnapshot>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    transfers: BTreeMap<u64, TransferState>,
    counters: Counters,
}

impl Inner {
    fn evict(&mut self, linger: Duration, now: Instant) {
        self.transfers.retain(|_, t| !t.expired(linger, now));
    }
}

#[derive(Debug)]
pub struct ProgressAggregator {
    inner: Mutex<Inner>,
    linger: Duration,
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl ProgressAggregator {
    /// `linger` is how long finished transfers stay visible.
    pub fn new(linger: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            linger,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a transfer. `total` is `None` for unsized responses.
    pub fn register(&self, label: impl Into<String>, total: Option<u64>) -> TransferId {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.evict(self.linger, now);
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .transfers
            .insert(id, TransferState::new(label.into(), total, now));
        TransferId(id)
    }

    pub fn advance(&self, id: TransferId, delta: u64) {
        let now = Instant::now();
        if let Some(t) = self.lock().transfers.get_mut(&id.0) {
            t.advance(delta, now);
        }
    }

    /// Count bytes already on disk (resume) without affecting the rate.
    pub fn skip_ahead(&self, id: TransferId, bytes: u64) {
        if let Some(t) = self.lock().transfers.get_mut(&id.0) {
            t.skip_ahead(bytes);
        }
    }

    pub fn finish(&self, id: TransferId, status: TransferStatus) {
        let now = Instant::now();
        if let Some(t) = self.lock().transfers.get_mut(&id.0) {
            t.finish(status, now);
        }
    }

    /// Overwrite the counters. `completed`/`failed` are clamped so they never
    /// exceed `total`; skipped and running are reset.
    pub fn set_totals(&self, total: u64, completed: u64, failed: u64) {
        let mut inner = self.lock();
        let completed = completed.min(total);
        let failed = failed.min(total - completed);
        let peak_running = inner.counters.peak_running;
        inner.counters = Counters {
            total,
            completed,
            failed,
            peak_running,
            ..Counters::default()
        };
    }

    /// Add jobs to the batch total. Called before the jobs become visible to
    /// workers. If the previous batch is fully resolved, a new batch starts.
    pub fn add_total(&self, n: u64) {
        self.lock().counters.add_total(n);
    }

    /// Atomically increment resolved counters; increments that would push
    /// `completed + failed + skipped` past `total` are dropped.
    pub fn bump(&self, completed: u64, failed: u64, skipped: u64) {
        let mut inner = self.lock();
        let c = &mut inner.counters;
        let completed = completed.min(c.headroom());
        c.completed += completed;
        let failed = failed.min(c.headroom());
        c.failed += failed;
        let skipped = skipped.min(c.headroom());
        c.skipped += skipped;
    }

    /// A worker claimed a job.
    pub fn job_started(&self) {
        let mut inner = self.lock();
        let c = &mut inner.counters;
        c.running += 1;
        c.peak_running = c.peak_running.max(c.running);
    }

    /// A running job reached a terminal state. `Waiting`/`Running` only
    /// release the running slot (the job was cancelled and stays unresolved).
    pub fn job_finished(&self, state: JobState) {
        let mut inner = self.lock();
        let c = &mut inner.counters;
        c.running = c.running.saturating_sub(1);
        let room = c.headroom();
        if room == 0 {
            return;
        }
        match state {
            JobState::Completed => c.completed += 1,
            JobState::Failed => c.failed += 1,
            JobState::Skipped => c.skipped += 1,
            JobState::Waiting | JobState::Running => {}
        }
    }

    pub fn counters(&self) -> Counters {
        self.lock().counters
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.evict(self.linger, now);
        let transfers: Vec<TransferSnapshot> = inner
            .transfers
            .iter()
            .map(|(id, t)| TransferSnapshot {
                id: TransferId(*id),
                label: t.label.clone(),
                total: t.total,
                done: t.done,
                rate: t.rate,
                status: t.status,
            })
            .collect();
        let throughput = transfers
            .iter()
            .filter(|t| t.status.is_none())
            .map(|t| t.rate)
            .sum();
        ProgressSnapshot {
            counters: inner.counters,
            throughput,
            transfers,
        }
    }

    /// The overall bar with counts and aggregate throughput.
    pub fn overall_line(&self) -> String {
        render::overall_line(&self.snapshot())
    }

    /// Up to `max` per-transfer lines in registration order. Running
    /// transfers take precedence; lingering finished ones fill what is left.
    pub fn active_transfer_lines(&self, max: usize) -> Vec<String> {
        let transfers = self.snapshot().transfers;
        let running = transfers.iter().filter(|t| t.status.is_none()).count();
        let mut finished_room = max.saturating_sub(running);
        let mut running_room = max;
        transfers
            .iter()
            .filter(|t| {
                let room = match t.status {
                    None => &mut running_room,
                    Some(_) => &mut finished_room,
                };
                if *room == 0 {
                    return false;
                }
                *room -= 1;
                true
            })
            .map(render::transfer_line)
            .collect()
    }
}
