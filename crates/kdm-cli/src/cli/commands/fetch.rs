//! `kdm fetch` – download the jobs listed in a manifest.

use anyhow::{Context, Result};
use kdm_core::config::KdmConfig;
use kdm_core::job::load_manifest;
use kdm_core::progress::Display;
use kdm_core::{ChunkedDownloader, CookieState, ProgressAggregator, RunSummary, WorkerPool};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const PROGRESS_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Overrides `[job] count`.
    pub workers: Option<usize>,
    pub show_progress: bool,
}

pub async fn run_fetch(cfg: &KdmConfig, manifest: &Path, opts: FetchOptions) -> Result<()> {
    let jobs = load_manifest(manifest)?;
    if jobs.is_empty() {
        println!("No jobs in manifest.");
        return Ok(());
    }
    let workers = opts.workers.unwrap_or(cfg.job.count).max(1);

    let cookies = Arc::new(CookieState::from_config(&cfg.cookies));
    let progress = Arc::new(ProgressAggregator::new(Duration::from_millis(
        cfg.progress.linger_ms,
    )));
    let pool = Arc::new(WorkerPool::new(
        ChunkedDownloader::new(cfg.downloader.clone()),
        cookies,
        Arc::clone(&progress),
    ));
    let queued = pool.enqueue(jobs);
    tracing::info!(queued, workers, manifest = %manifest.display(), "fetch starting");

    let control = pool.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("Stopping after in-flight downloads finish (Ctrl-C again to abort).");
        control.request_stop();
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Aborting; partial files are kept for resume.");
            control.request_abort();
        }
    });

    let mut runner = {
        let pool = Arc::clone(&pool);
        tokio::task::spawn_blocking(move || pool.run(workers))
    };

    let max_lines = match cfg.progress.max_lines {
        0 => workers,
        n => n,
    };
    let mut display = opts.show_progress.then(|| Display::for_stdout(max_lines));
    let mut ticker = tokio::time::interval(Duration::from_millis(PROGRESS_INTERVAL_MS));
    let summary = loop {
        tokio::select! {
            res = &mut runner => break res.context("worker pool panicked")?,
            _ = ticker.tick() => {
                if let Some(d) = display.as_mut() {
                    d.render(&mut io::stdout().lock(), &progress)?;
                }
            }
        }
    };
    if let Some(d) = display.as_mut() {
        d.render(&mut io::stdout().lock(), &progress)?;
    }

    report(&summary);
    Ok(())
}

fn report(summary: &RunSummary) {
    println!(
        "{} completed / {} skipped / {} failed",
        summary.completed, summary.skipped, summary.failed
    );
    if summary.cancelled > 0 {
        println!("{} cancelled (partial files kept)", summary.cancelled);
    }
    if summary.failed > 0 {
        tracing::warn!(failed = summary.failed, "some downloads failed");
        eprintln!(
            "warning: {} download(s) failed; see the log for details",
            summary.failed
        );
    }
}
