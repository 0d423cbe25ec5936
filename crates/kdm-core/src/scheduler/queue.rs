//! Shared FIFO of jobs waiting for a worker.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::job::Job;
use crate::progress::ProgressAggregator;

#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a batch. The aggregator total grows while the queue lock is
    /// held, so no worker can resolve one of these jobs before it is counted.
    pub fn push_batch(&self, jobs: Vec<Job>, progress: &ProgressAggregator) -> usize {
        let n = jobs.len();
        if n == 0 {
            return 0;
        }
        let mut queue = self.lock();
        progress.add_total(n as u64);
        queue.extend(jobs);
        n
    }

    /// Claim the oldest waiting job.
    pub fn pop(&self) -> Option<Job> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every waiting job; returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut queue = self.lock();
        let n = queue.len();
        queue.clear();
        n
    }
}
