//! Per-job download failure type.

/// Failure of a single download attempt. Returned by value so the worker pool
/// can classify it and decide on a retry; none of these abort the batch.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Transport failure reported by curl (connect, DNS, timeout, reset).
    #[error("network: {0}")]
    Network(#[from] curl::Error),
    /// Final response status was not 200/206.
    #[error("HTTP {code}")]
    HttpStatus { code: u32 },
    /// Size or checksum mismatch; the partial file has been removed.
    #[error("integrity: {0}")]
    Integrity(String),
    /// Neither Content-Disposition, the hint, nor the URL yielded a name.
    #[error("cannot resolve a filename for {url}")]
    FilenameResolution { url: String },
    /// Local disk failure (permission denied, disk full).
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
    /// Aborted by the caller; partial data stays in the temp file.
    #[error("transfer aborted")]
    Cancelled,
}

impl DownloadError {
    /// Short stable name used in logs and summaries.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DownloadError::Network(_) => "NetworkError",
            DownloadError::HttpStatus { .. } => "HTTPStatusError",
            DownloadError::Integrity(_) => "IntegrityError",
            DownloadError::FilenameResolution { .. } => "FilenameResolutionError",
            DownloadError::Storage(_) => "StorageError",
            DownloadError::Cancelled => "Cancelled",
        }
    }
}
