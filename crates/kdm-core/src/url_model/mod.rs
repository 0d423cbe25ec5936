//! URL composition and filename derivation.
//!
//! Builds absolute download URLs from server-relative paths and derives safe
//! local filenames from Content-Disposition, a caller hint, or the server path.

mod content_disposition;
mod path;
mod sanitize;

pub use content_disposition::parse_content_disposition_filename;
pub use path::filename_from_server_path;
pub use sanitize::sanitize_filename;

use crate::config::DownloaderConfig;

/// Absolute URL for a server-relative path, wrapped by the reverse proxy template.
///
/// # Examples
///
/// - scheme `https`, host `files.example`, path `/data/a.png`, proxy `{}`
///   gives `https://files.example/data/a.png`
/// - proxy `https://proxy.example/?u={}` gives
///   `https://proxy.example/?u=https://files.example/data/a.png`
pub fn build_download_url(cfg: &DownloaderConfig, server_path: &str) -> String {
    let sep = if server_path.starts_with('/') { "" } else { "/" };
    let url = format!("{}://{}{}{}", cfg.scheme, cfg.files_host, sep, server_path);
    if cfg.reverse_proxy.contains("{}") {
        cfg.reverse_proxy.replace("{}", &url)
    } else {
        url
    }
}

fn clean(candidate: Option<String>) -> Option<String> {
    candidate
        .map(|c| sanitize_filename(&c))
        .filter(|c| !c.is_empty())
}

/// Filename to use before any response is seen: caller hint, else the last
/// server path segment. The server path, not the request URL, so a reverse
/// proxy never decides the name.
pub fn provisional_filename(hint: Option<&str>, server_path: &str) -> Option<String> {
    clean(hint.map(str::to_string)).or_else(|| clean(filename_from_server_path(server_path)))
}

/// Final filename: Content-Disposition, else caller hint, else server path segment.
/// `None` only when all three yield nothing usable.
pub fn resolve_filename(
    content_disposition: Option<&str>,
    hint: Option<&str>,
    server_path: &str,
) -> Option<String> {
    clean(content_disposition.and_then(parse_content_disposition_filename))
        .or_else(|| provisional_filename(hint, server_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(proxy: &str) -> DownloaderConfig {
        DownloaderConfig {
            scheme: "https".into(),
            files_host: "files.example".into(),
            reverse_proxy: proxy.into(),
            ..DownloaderConfig::default()
        }
    }

    #[test]
    fn download_url_plain_and_proxied() {
        assert_eq!(
            build_download_url(&cfg("{}"), "/data/a.png"),
            "https://files.example/data/a.png"
        );
        assert_eq!(
            build_download_url(&cfg("https://proxy.example/?u={}"), "/data/a.png"),
            "https://proxy.example/?u=https://files.example/data/a.png"
        );
        assert_eq!(
            build_download_url(&cfg(""), "data/a.png"),
            "https://files.example/data/a.png"
        );
    }

    #[test]
    fn header_beats_hint() {
        assert_eq!(
            resolve_filename(
                Some("attachment; filename=\"a.txt\""),
                Some("b.txt"),
                "/x/c.txt"
            )
            .as_deref(),
            Some("a.txt")
        );
    }

    #[test]
    fn hint_beats_url() {
        assert_eq!(
            resolve_filename(None, Some("b.txt"), "/x/c.txt").as_deref(),
            Some("b.txt")
        );
        assert_eq!(
            resolve_filename(Some("inline"), Some("b.txt"), "/x/c.txt").as_deref(),
            Some("b.txt")
        );
    }

    #[test]
    fn server_path_segment_last() {
        assert_eq!(
            resolve_filename(None, None, "/x/c%20d.txt").as_deref(),
            Some("c d.txt")
        );
        assert_eq!(
            resolve_filename(None, Some("  "), "/x/c.txt").as_deref(),
            Some("c.txt")
        );
    }

    #[test]
    fn nothing_usable() {
        assert_eq!(resolve_filename(None, None, "/"), None);
        assert_eq!(resolve_filename(None, Some(".."), ""), None);
    }

    #[test]
    fn proxy_url_never_names_the_file() {
        let cfg = cfg("http://proxy.example/fetch?u={}");
        let server_path = "/data/x/a%20b.bin?f=1";
        assert_eq!(
            build_download_url(&cfg, server_path),
            "http://proxy.example/fetch?u=https://files.example/data/x/a%20b.bin?f=1"
        );
        assert_eq!(provisional_filename(None, server_path).as_deref(), Some("a b.bin"));
        assert_eq!(resolve_filename(None, None, server_path).as_deref(), Some("a b.bin"));
    }

    #[test]
    fn header_names_are_sanitized() {
        assert_eq!(
            resolve_filename(Some("attachment; filename=\"../../etc/passwd\""), None, "/")
                .as_deref(),
            Some(".._.._etc_passwd")
        );
    }
}
