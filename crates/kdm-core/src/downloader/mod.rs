//! Resumable single-file HTTP downloader.
//!
//! `ChunkedDownloader::download` turns one URL into one file: duplicate check,
//! ranged GET resuming any `<name>.<suffix>` temp file, streaming with
//! progress, size/digest verification, rename, timestamps. Every failure
//! comes back as a `DownloadError` value; retrying is the caller's decision.

mod dedup;
mod error;
mod finish;
mod headers;
mod transfer;

pub use error::DownloadError;
pub use headers::{ContentRange, ResponseHeaders};

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DownloaderConfig;
use crate::control::PoolControl;
use crate::cookies::CookieState;
use crate::job::SkipReason;
use crate::progress::ProgressAggregator;
use crate::storage;
use crate::url_model;

use transfer::{Fetched, Plan};

/// What to fetch and where to put it.
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    pub url: &'a str,
    pub dest_dir: &'a Path,
    /// Filename used when the response has no Content-Disposition.
    pub hint: Option<&'a str>,
    /// Server-relative path. Names the file when there is no header or hint,
    /// and keys the bucket entry.
    pub server_path: &'a str,
}

/// Successful result of one download call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Downloaded {
    Completed { filename: String, bytes: u64 },
    Skipped(SkipReason),
}

#[derive(Debug, Clone)]
pub struct ChunkedDownloader {
    cfg: DownloaderConfig,
}

impl ChunkedDownloader {
    pub fn new(cfg: DownloaderConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.cfg
    }

    fn bucket_for(&self, server_path: &str) -> Option<PathBuf> {
        self.cfg
            .use_bucket
            .then(|| storage::bucket_file_path(&self.cfg.bucket_path, server_path))
    }

    /// Download `req.url` into `req.dest_dir`.
    ///
    /// Request cookies come from `cookies`, and anti-bot cookies in every
    /// response are written back to it. Progress is registered once headers
    /// arrive. `control` aborts the transfer at the next chunk; the partial
    /// temp file is kept for a later resume.
    pub fn download(
        &self,
        req: &DownloadRequest<'_>,
        cookies: Option<&CookieState>,
        progress: &ProgressAggregator,
        control: &PoolControl,
    ) -> Result<Downloaded, DownloadError> {
        let provisional = url_model::provisional_filename(req.hint, req.server_path);
        let bucket = self.bucket_for(req.server_path);

        let mut resume_from = 0;
        if let Some(name) = provisional.as_deref() {
            let final_path = req.dest_dir.join(name);
            if let Some(reason) = dedup::duplicate_check(&final_path, bucket.as_deref())? {
                return Ok(Downloaded::Skipped(reason));
            }
            let temp = storage::temp_path(&final_path, &self.cfg.temp_suffix);
            resume_from = storage::existing_len(&temp)?.unwrap_or(0);
        }
        fs::create_dir_all(req.dest_dir)?;

        if resume_from > 0 {
            tracing::debug!(url = req.url, offset = resume_from, "resuming partial download");
        }
        let plan = Plan {
            cfg: &self.cfg,
            url: req.url,
            dest_dir: req.dest_dir,
            hint: req.hint,
            server_path: req.server_path,
            provisional: provisional.as_deref(),
            bucket: bucket.as_deref(),
            resume_from,
            cookies,
            progress,
            control,
        };
        let fetched = transfer::fetch(&plan)?;
        let outcome = match fetched {
            Fetched::Skipped(reason) => Ok(Downloaded::Skipped(reason)),
            Fetched::Ready(ready) => self.complete(ready, bucket.as_deref()),
        };
        outcome
    }
}
