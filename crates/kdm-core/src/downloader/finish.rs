//! Verify a finished body and move it into place.

use std::fs::File;
use std::path::Path;
use std::time::SystemTime;

use crate::checksum;
use crate::storage;

use super::headers::ResponseHeaders;
use super::transfer::Ready;
use super::{ChunkedDownloader, DownloadError, Downloaded};

impl ChunkedDownloader {
    /// Size and digest checks, bucket link, rename, timestamps.
    /// A failed check deletes the temp file.
    pub(super) fn complete(&self, mut ready: Ready<'_>, bucket: Option<&Path>) -> Result<Downloaded, DownloadError> {
        let cfg = self.config();

        if cfg.verify_file_integrity {
            if let Some(expected) = ready.expected {
                if ready.size != expected {
                    storage::discard(&ready.temp)?;
                    return Err(DownloadError::Integrity(format!(
                        "size mismatch for {}: got {} bytes, expected {}",
                        ready.final_name, ready.size, expected
                    )));
                }
            }
        }

        if cfg.checksum_verification {
            if let Some(expected) = ready.headers.sha256.as_deref() {
                let actual = checksum::sha256_reader(File::open(&ready.temp)?)?;
                if actual != expected {
                    storage::discard(&ready.temp)?;
                    return Err(DownloadError::Integrity(format!(
                        "sha256 mismatch for {}: got {}, expected {}",
                        ready.final_name, actual, expected
                    )));
                }
                tracing::debug!(file = %ready.final_name, "sha256 verified");
            }
        }

        if let Some(bucket) = bucket {
            if storage::link_if_absent(&ready.temp, bucket)? {
                tracing::debug!(bucket = %bucket.display(), "stored in bucket");
            }
        }
        storage::finalize(&ready.temp, &ready.final_path)?;

        if cfg.keep_metadata {
            apply_modified_time(&ready.final_path, &ready.headers);
        }

        ready.guard.complete();
        Ok(Downloaded::Completed {
            filename: ready.final_name,
            bytes: ready.size,
        })
    }
}

/// Best effort: stamp Last-Modified (or Date) on the file.
fn apply_modified_time(path: &Path, headers: &ResponseHeaders) {
    let Some(raw) = headers.modified_time() else {
        return;
    };
    let when = match chrono::DateTime::parse_from_rfc2822(raw) {
        Ok(t) => SystemTime::from(t),
        Err(e) => {
            tracing::debug!("unparseable modification time {:?}: {}", raw, e);
            return;
        }
    };
    let result = File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(when));
    if let Err(e) = result {
        tracing::debug!("could not set mtime on {}: {}", path.display(), e);
    }
}
