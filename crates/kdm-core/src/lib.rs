pub mod config;
pub mod logging;

pub mod checksum;
pub mod control;
pub mod cookies;
pub mod downloader;
pub mod job;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod storage;
pub mod url_model;

pub use control::PoolControl;
pub use cookies::CookieState;
pub use downloader::{ChunkedDownloader, DownloadError, DownloadRequest, Downloaded};
pub use job::{FileType, Job, JobOutcome, JobState, PostContext, SkipReason};
pub use progress::ProgressAggregator;
pub use scheduler::{RunSummary, WorkerPool};
