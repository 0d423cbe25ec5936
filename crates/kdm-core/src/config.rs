use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::{MaxAttempts, RetryPolicy};

/// File downloader parameters (`[downloader]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// URL scheme used to compose download URLs.
    pub scheme: String,
    /// Host serving post files and attachments.
    pub files_host: String,
    /// Connect timeout and stall timeout in seconds.
    pub timeout_secs: f64,
    /// Bytes requested per body chunk from the transport.
    pub chunk_size: usize,
    /// File I/O buffer in bytes.
    pub buffer_size: usize,
    /// Suffix appended to partial files, e.g. `photo.png.tmp`.
    pub temp_suffix: String,
    /// Maximum attempts per job, including the first.
    pub retry_times: u32,
    /// Retry transient failures forever (ignores `retry_times`).
    pub retry_stop_never: bool,
    /// Fixed delay between attempts in seconds.
    pub retry_interval_secs: f64,
    /// Maximum requests per second across all workers.
    pub tps_limit: Option<f64>,
    /// Store files once under `bucket_path` and hard-link them into place.
    pub use_bucket: bool,
    pub bucket_path: PathBuf,
    /// URL template; `{}` is replaced by the original download URL.
    pub reverse_proxy: String,
    /// Apply Last-Modified (or Date) to downloaded files.
    pub keep_metadata: bool,
    /// Check the final size against the advertised total.
    pub verify_file_integrity: bool,
    /// Compare a SHA-256 digest when the server sends one.
    pub checksum_verification: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            files_host: "kemono.su".to_string(),
            timeout_secs: 30.0,
            chunk_size: 1024 * 1024,
            buffer_size: 20480,
            temp_suffix: "tmp".to_string(),
            retry_times: 10,
            retry_stop_never: false,
            retry_interval_secs: 3.0,
            tps_limit: Some(5.0),
            use_bucket: false,
            bucket_path: PathBuf::from("./.kdm/bucket"),
            reverse_proxy: "{}".to_string(),
            keep_metadata: true,
            verify_file_integrity: true,
            checksum_verification: false,
        }
    }
}

/// Upper bound for any configured wait; larger (or infinite) values are clamped.
pub const MAX_WAIT_SECS: f64 = 24.0 * 60.0 * 60.0;

/// Seconds from config as a `Duration`, clamped to `[min, MAX_WAIT_SECS]`.
/// NaN falls back to `min`.
pub fn bounded_secs(secs: f64, min: f64) -> Duration {
    let secs = if secs.is_nan() {
        min
    } else {
        secs.clamp(min, MAX_WAIT_SECS)
    };
    Duration::from_secs_f64(secs)
}

impl DownloaderConfig {
    pub fn timeout(&self) -> Duration {
        bounded_secs(self.timeout_secs, 0.1)
    }

    /// Worker-level retry policy derived from the retry fields.
    pub fn retry_policy(&self) -> RetryPolicy {
        let attempts = if self.retry_stop_never {
            MaxAttempts::Unbounded
        } else {
            MaxAttempts::Limited(self.retry_times.max(1))
        };
        RetryPolicy {
            attempts,
            interval: bounded_secs(self.retry_interval_secs, 0.0),
        }
    }
}

/// Job runner parameters (`[job]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Number of concurrent download workers.
    pub count: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self { count: 4 }
    }
}

/// Cookie seeding (`[cookies]`).
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Session key found in the `session` cookie after logging in.
    pub session_key: Option<String>,
    /// Address used for the IP-shaped anti-bot cookie.
    pub client_ip: Option<String>,
    /// Pre-seeded anti-bot cookies; generated when empty.
    pub anti_bot: BTreeMap<String, String>,
}

// Hand-written so the session key never reaches the log.
impl fmt::Debug for CookieConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieConfig")
            .field("session_key", &self.session_key.as_ref().map(|_| "<redacted>"))
            .field("client_ip", &self.client_ip)
            .field("anti_bot", &self.anti_bot.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Progress display (`[progress]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// How long a finished transfer stays on screen.
    pub linger_ms: u64,
    /// Per-transfer lines to render; 0 means "same as worker count".
    pub max_lines: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            linger_ms: 1000,
            max_lines: 0,
        }
    }
}

/// Global configuration loaded from `~/.config/kdm/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KdmConfig {
    pub downloader: DownloaderConfig,
    pub job: JobConfig,
    pub cookies: CookieConfig,
    pub progress: ProgressConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("kdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<KdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = KdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: KdmConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
