//! Retry policy for whole jobs.
//!
//! Classification of download failures and the fixed-interval retry decision
//! live here; the worker pool is the only caller that acts on them.

mod classify;
mod policy;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, MaxAttempts, RetryDecision, RetryPolicy};
