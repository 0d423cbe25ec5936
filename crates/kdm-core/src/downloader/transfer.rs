//! One HTTP GET driven through libcurl, streamed into a temp file.
//!
//! Headers are collected per response (redirect hops reset the block); the
//! first body chunk triggers status checks, filename resolution and the second
//! duplicate check before anything touches the disk. Returning `Ok(0)` from
//! the write callback is how every early stop aborts the transfer.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use crate::config::DownloaderConfig;
use crate::control::PoolControl;
use crate::cookies::CookieState;
use crate::job::SkipReason;
use crate::progress::{ProgressAggregator, TransferId, TransferStatus};
use crate::storage::{self, ChunkWriter, OpenMode};
use crate::url_model;

use super::dedup;
use super::headers::ResponseHeaders;
use super::DownloadError;

const MAX_REDIRECTS: u32 = 10;
const USER_AGENT: &str = concat!("kdm/", env!("CARGO_PKG_VERSION"));

/// Registers a progress line and finishes it on drop; failed unless completed.
pub(super) struct TransferGuard<'a> {
    progress: &'a ProgressAggregator,
    id: TransferId,
    status: TransferStatus,
}

impl<'a> TransferGuard<'a> {
    fn new(progress: &'a ProgressAggregator, label: String, total: Option<u64>) -> Self {
        Self {
            id: progress.register(label, total),
            progress,
            status: TransferStatus::Failed,
        }
    }

    pub fn id(&self) -> TransferId {
        self.id
    }

    pub fn complete(&mut self) {
        self.status = TransferStatus::Completed;
    }
}

impl Drop for TransferGuard<'_> {
    fn drop(&mut self) {
        self.progress.finish(self.id, self.status);
    }
}

/// Everything one attempt needs.
pub(super) struct Plan<'a> {
    pub cfg: &'a DownloaderConfig,
    pub url: &'a str,
    pub dest_dir: &'a Path,
    pub hint: Option<&'a str>,
    pub server_path: &'a str,
    /// Name known before the request; also names the temp file.
    pub provisional: Option<&'a str>,
    pub bucket: Option<&'a Path>,
    pub resume_from: u64,
    pub cookies: Option<&'a CookieState>,
    pub progress: &'a ProgressAggregator,
    pub control: &'a PoolControl,
}

/// A body fully on disk in `temp`, waiting for verification and rename.
pub(super) struct Ready<'a> {
    pub headers: ResponseHeaders,
    pub temp: PathBuf,
    pub final_path: PathBuf,
    pub final_name: String,
    pub size: u64,
    pub expected: Option<u64>,
    pub guard: TransferGuard<'a>,
}

pub(super) enum Fetched<'a> {
    Ready(Ready<'a>),
    Skipped(SkipReason),
}

enum Stop {
    Skip(SkipReason),
    Fail(DownloadError),
}

impl From<DownloadError> for Stop {
    fn from(e: DownloadError) -> Self {
        Stop::Fail(e)
    }
}

impl From<std::io::Error> for Stop {
    fn from(e: std::io::Error) -> Self {
        Stop::Fail(DownloadError::Storage(e))
    }
}

#[derive(Default)]
struct Session<'a> {
    prepared: bool,
    writer: Option<ChunkWriter>,
    ready: Option<Ready<'a>>,
    stop: Option<Stop>,
}

impl<'a> Session<'a> {
    fn prepare(&mut self, plan: &Plan<'a>, lines: &[String]) -> Result<(), Stop> {
        self.prepared = true;
        match prepare(plan, lines)? {
            (ready, Some(writer)) => {
                self.writer = Some(writer);
                self.ready = Some(ready);
            }
            (ready, None) => self.ready = Some(ready),
        }
        Ok(())
    }

    fn write(&mut self, plan: &Plan<'a>, data: &[u8]) -> usize {
        match (self.writer.as_mut(), self.ready.as_ref()) {
            (Some(w), Some(r)) => match w.write_chunk(data) {
                Ok(()) => {
                    plan.progress.advance(r.guard.id(), data.len() as u64);
                    data.len()
                }
                Err(e) => {
                    self.stop = Some(e.into());
                    0
                }
            },
            // Range already satisfied: the error body is not file content.
            (None, Some(_)) => data.len(),
            _ => 0,
        }
    }
}

/// Inspect the final response headers and get ready to write.
/// Returns the writer unless the range was already satisfied.
fn prepare<'a>(plan: &Plan<'a>, lines: &[String]) -> Result<(Ready<'a>, Option<ChunkWriter>), Stop> {
    let headers = ResponseHeaders::parse(lines);
    let code = headers.status.unwrap_or(0);
    let resuming = plan.resume_from > 0;
    let range_total = headers.content_range.and_then(|r| r.total);

    let mode = match code {
        206 if resuming => {
            if let Some(start) = headers.content_range.and_then(|r| r.start) {
                if start != plan.resume_from {
                    // Offsets disagree; drop the partial so the next attempt starts clean.
                    if let Some(name) = plan.provisional {
                        let temp = plan.dest_dir.join(name);
                        storage::discard(&storage::temp_path(&temp, &plan.cfg.temp_suffix))?;
                    }
                    return Err(Stop::Fail(DownloadError::Integrity(format!(
                        "server resumed at byte {}, expected {}",
                        start, plan.resume_from
                    ))));
                }
            }
            Some(OpenMode::Append)
        }
        416 if resuming && range_total == Some(plan.resume_from) => None,
        200..=299 => {
            if resuming {
                tracing::debug!(url = plan.url, "server ignored Range, restarting from zero");
            }
            Some(OpenMode::Truncate)
        }
        _ => return Err(Stop::Fail(DownloadError::HttpStatus { code })),
    };

    let final_name = url_model::resolve_filename(
        headers.content_disposition.as_deref(),
        plan.hint,
        plan.server_path,
    )
    .ok_or_else(|| DownloadError::FilenameResolution {
        url: plan.url.to_string(),
    })?;
    let final_path = plan.dest_dir.join(&final_name);

    if plan.provisional != Some(final_name.as_str()) {
        if let Some(reason) = dedup::duplicate_check(&final_path, plan.bucket)? {
            return Err(Stop::Skip(reason));
        }
    }

    let temp_name = plan.provisional.unwrap_or(final_name.as_str());
    let temp = storage::temp_path(&plan.dest_dir.join(temp_name), &plan.cfg.temp_suffix);
    let expected = match mode {
        None => Some(plan.resume_from),
        Some(_) => headers.total_size(),
    };
    let guard = TransferGuard::new(plan.progress, final_name.clone(), expected);
    let mut ready = Ready {
        headers,
        temp,
        final_path,
        final_name,
        size: 0,
        expected,
        guard,
    };

    let Some(mode) = mode else {
        tracing::debug!(file = %ready.final_name, "requested range already on disk");
        plan.progress.skip_ahead(ready.guard.id(), plan.resume_from);
        ready.size = plan.resume_from;
        return Ok((ready, None));
    };
    let writer = ChunkWriter::open(&ready.temp, mode, plan.cfg.buffer_size)?;
    if mode == OpenMode::Append {
        plan.progress.skip_ahead(ready.guard.id(), writer.len());
    }
    tracing::debug!(
        file = %ready.final_name,
        status = code,
        offset = writer.len(),
        total = ?expected,
        "transfer started"
    );
    Ok((ready, Some(writer)))
}

/// Run the request described by `plan`.
pub(super) fn fetch<'a>(plan: &Plan<'a>) -> Result<Fetched<'a>, DownloadError> {
    let block: RefCell<Vec<String>> = RefCell::new(Vec::new());
    let session: RefCell<Session<'a>> = RefCell::new(Session::default());

    let mut easy = curl::easy::Easy::new();
    easy.url(plan.url)?;
    easy.useragent(USER_AGENT)?;
    easy.follow_location(true)?;
    easy.max_redirections(MAX_REDIRECTS)?;
    easy.connect_timeout(plan.cfg.timeout())?;
    // Stall detection: less than 1 byte/s for the whole timeout.
    easy.low_speed_limit(1)?;
    easy.low_speed_time(plan.cfg.timeout())?;
    easy.buffer_size(plan.cfg.chunk_size)?;
    easy.progress(true)?;
    if plan.resume_from > 0 {
        easy.range(&format!("{}-", plan.resume_from))?;
    }
    if let Some(cookie) = plan.cookies.and_then(CookieState::cookie_header) {
        easy.cookie(&cookie)?;
    }

    let result = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            let line = String::from_utf8_lossy(data);
            let line = line.trim_end();
            let mut block = block.borrow_mut();
            if line.starts_with("HTTP/") {
                block.clear();
            }
            if line.is_empty() {
                // End of one response's headers, redirect hops included.
                if let Some(cookies) = plan.cookies {
                    cookies.update_from_response(&block[..]);
                }
            } else {
                block.push(line.to_string());
            }
            true
        })?;
        transfer.progress_function(|_, _, _, _| !plan.control.is_aborted())?;
        transfer.write_function(|data| {
            let mut s = session.borrow_mut();
            if plan.control.is_aborted() {
                s.stop.get_or_insert(Stop::Fail(DownloadError::Cancelled));
                return Ok(0);
            }
            if !s.prepared {
                if let Err(stop) = s.prepare(plan, &block.borrow()) {
                    s.stop = Some(stop);
                    return Ok(0);
                }
            }
            Ok(s.write(plan, data))
        })?;
        transfer.perform()
    };

    let mut s = session.into_inner();
    match s.stop.take() {
        Some(Stop::Skip(reason)) => return Ok(Fetched::Skipped(reason)),
        Some(Stop::Fail(e)) => return Err(e),
        None => {}
    }
    if plan.control.is_aborted() {
        return Err(DownloadError::Cancelled);
    }
    result?;

    // Empty bodies never reach the write callback.
    if !s.prepared {
        match s.prepare(plan, &block.borrow()) {
            Ok(()) => {}
            Err(Stop::Skip(reason)) => return Ok(Fetched::Skipped(reason)),
            Err(Stop::Fail(e)) => return Err(e),
        }
    }
    let Some(mut ready) = s.ready.take() else {
        return Err(DownloadError::Integrity("response ended before headers".into()));
    };
    if let Some(writer) = s.writer.take() {
        ready.size = writer.close()?;
    }
    Ok(Fetched::Ready(ready))
}
