//! Job scheduling: the shared queue, request pacing and the worker pool.

mod pool;
mod queue;
mod rate;

pub use pool::{RunSummary, WorkerPool};
pub use queue::JobQueue;
pub use rate::RateLimiter;
