//! Classify HTTP status and curl errors into retry policy error kinds.

use crate::downloader::DownloadError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code. Only 5xx is transient; 4xx is the client's problem.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
        || e.is_ssl_connect_error()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a download failure into an ErrorKind.
pub fn classify(e: &DownloadError) -> ErrorKind {
    match e {
        DownloadError::Network(ce) => match classify_curl_error(ce) {
            // Any transport failure is worth another attempt.
            ErrorKind::Other => ErrorKind::Connection,
            kind => kind,
        },
        DownloadError::HttpStatus { code } => classify_http_status(*code),
        DownloadError::Integrity(_)
        | DownloadError::FilenameResolution { .. }
        | DownloadError::Storage(_)
        | DownloadError::Cancelled => ErrorKind::Other,
    }
}
