//! Fixed-size worker pool over the shared job queue.
//!
//! Workers are scoped OS threads; each loops claim → download (with retries)
//! → record until the queue is empty or the pool is stopped. Outcomes flow
//! back to the calling thread over a channel and are tallied there.

use std::sync::mpsc;
use std::sync::Arc;

use crate::control::PoolControl;
use crate::cookies::CookieState;
use crate::downloader::{ChunkedDownloader, DownloadError, DownloadRequest, Downloaded};
use crate::job::{Job, JobOutcome, JobState};
use crate::progress::ProgressAggregator;
use crate::retry::{self, RetryDecision, RetryPolicy};
use crate::url_model;

use super::queue::JobQueue;
use super::rate::RateLimiter;

/// Counts for one `run`. `cancelled` jobs were claimed but interrupted by
/// stop/abort; they are neither failed nor resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: Option<&JobOutcome>) {
        match outcome.map(JobOutcome::state) {
            Some(JobState::Completed) => self.completed += 1,
            Some(JobState::Skipped) => self.skipped += 1,
            Some(JobState::Failed) => self.failed += 1,
            _ => self.cancelled += 1,
        }
    }

    pub fn resolved(&self) -> u64 {
        self.completed + self.skipped + self.failed
    }
}

pub struct WorkerPool {
    queue: JobQueue,
    downloader: ChunkedDownloader,
    cookies: Arc<CookieState>,
    progress: Arc<ProgressAggregator>,
    control: PoolControl,
    policy: RetryPolicy,
    limiter: Option<RateLimiter>,
}

impl WorkerPool {
    /// Retry policy and request pacing come from the downloader config.
    pub fn new(
        downloader: ChunkedDownloader,
        cookies: Arc<CookieState>,
        progress: Arc<ProgressAggregator>,
    ) -> Self {
        let cfg = downloader.config();
        let policy = cfg.retry_policy();
        let limiter = cfg.tps_limit.and_then(RateLimiter::per_second);
        Self {
            queue: JobQueue::new(),
            downloader,
            cookies,
            progress,
            control: PoolControl::new(),
            policy,
            limiter,
        }
    }

    /// Handle for stopping or aborting a running pool from another thread.
    pub fn control(&self) -> PoolControl {
        self.control.clone()
    }

    pub fn progress(&self) -> &Arc<ProgressAggregator> {
        &self.progress
    }

    pub fn cookies(&self) -> &Arc<CookieState> {
        &self.cookies
    }

    /// Queue jobs; the progress total includes them before any worker sees them.
    pub fn enqueue(&self, jobs: impl IntoIterator<Item = Job>) -> usize {
        self.queue.push_batch(jobs.into_iter().collect(), &self.progress)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Process the queue with `worker_count` workers until it drains or the
    /// pool is stopped. Individual failures never end the run early.
    pub fn run(&self, worker_count: usize) -> RunSummary {
        let workers = worker_count.max(1).min(self.queue.len().max(1));
        self.cookies.refresh_time_sensitive();
        tracing::info!(workers, queued = self.queue.len(), "worker pool starting");

        let (tx, rx) = mpsc::channel::<Option<JobOutcome>>();
        let mut summary = RunSummary::default();
        std::thread::scope(|scope| {
            for worker in 0..workers {
                let tx = tx.clone();
                scope.spawn(move || self.worker_loop(worker, tx));
            }
            drop(tx);
            for outcome in rx {
                summary.record(outcome.as_ref());
            }
        });

        if self.control.is_stopped() {
            let dropped = self.queue.clear();
            tracing::info!(dropped, "worker pool stopped before the queue drained");
        }
        tracing::info!(
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "worker pool finished"
        );
        summary
    }

    fn worker_loop(&self, worker: usize, tx: mpsc::Sender<Option<JobOutcome>>) {
        loop {
            if self.control.is_stopped() {
                break;
            }
            let Some(job) = self.queue.pop() else {
                break;
            };
            self.progress.job_started();
            let outcome = self.process(&job);
            match &outcome {
                Some(JobOutcome::Completed(name)) => {
                    tracing::info!(worker, "{}: saved as {}", job, name)
                }
                Some(JobOutcome::Skipped(reason)) => tracing::info!(worker, "{}: {}", job, reason),
                Some(JobOutcome::Failed(kind, msg)) => {
                    tracing::warn!(worker, "{}: failed ({}): {}", job, kind, msg)
                }
                None => tracing::info!(worker, "{}: cancelled", job),
            }
            let state = outcome.as_ref().map_or(JobState::Running, JobOutcome::state);
            self.progress.job_finished(state);
            if tx.send(outcome).is_err() {
                break;
            }
        }
        tracing::debug!(worker, "worker exiting");
    }

    /// Run one job to a terminal outcome, retrying transient failures.
    /// `None` means the job was cancelled.
    fn process(&self, job: &Job) -> Option<JobOutcome> {
        let url = url_model::build_download_url(self.downloader.config(), &job.server_path);
        let req = DownloadRequest {
            url: &url,
            dest_dir: &job.path,
            hint: job.alt_filename.as_deref(),
            server_path: &job.server_path,
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if let Some(limiter) = &self.limiter {
                if !limiter.acquire(&self.control) {
                    return None;
                }
            }
            let err = match self.downloader.download(
                &req,
                Some(self.cookies.as_ref()),
                &self.progress,
                &self.control,
            ) {
                Ok(Downloaded::Completed { filename, .. }) => {
                    return Some(JobOutcome::Completed(filename))
                }
                Ok(Downloaded::Skipped(reason)) => return Some(JobOutcome::Skipped(reason)),
                Err(DownloadError::Cancelled) => return None,
                Err(e) => e,
            };

            match self.policy.decide(attempt, retry::classify(&err)) {
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        attempt,
                        "{}: {} ({}), retrying in {:?}",
                        job,
                        err,
                        err.kind_name(),
                        delay
                    );
                    if !self.control.sleep(delay) {
                        return None;
                    }
                }
                RetryDecision::NoRetry => {
                    return Some(JobOutcome::Failed(err.kind_name(), err.to_string()))
                }
            }
        }
    }
}
