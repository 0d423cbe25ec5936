//! CLI for the KDM post-file download manager.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kdm_core::config;
use std::path::Path;

use commands::{run_checksum, run_fetch, FetchOptions};

/// Top-level CLI for the KDM download manager.
#[derive(Debug, Parser)]
#[command(name = "kdm")]
#[command(about = "KDM: concurrent resumable downloader for post files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every job in a JSON manifest.
    Fetch {
        /// Path to a JSON array of jobs.
        manifest: String,
        /// Concurrent downloads (default: `[job] count` from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Do not draw the progress display; only print the summary.
        #[arg(long)]
        no_progress: bool,
    },

    /// Compute SHA-256 of a file (e.g. after download).
    Checksum {
        /// Path to the file.
        path: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Fetch {
                manifest,
                jobs,
                no_progress,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let opts = FetchOptions {
                    workers: jobs,
                    show_progress: !no_progress,
                };
                run_fetch(&cfg, Path::new(&manifest), opts).await?;
            }
            CliCommand::Checksum { path } => run_checksum(Path::new(&path)).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
