//! Parse one HTTP response header block.

use crate::checksum;

/// Parsed `Content-Range`: `bytes <start>-<end>/<total>` or `bytes */<total>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: Option<u64>,
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.trim().strip_prefix("bytes")?.trim_start();
        let (range, total) = rest.split_once('/')?;
        let total = match total.trim() {
            "*" => None,
            t => Some(t.parse().ok()?),
        };
        let start = match range.trim() {
            "*" => None,
            r => Some(r.split_once('-')?.0.trim().parse().ok()?),
        };
        Some(ContentRange { start, total })
    }
}

/// Headers of the final response of a request (redirect hops excluded).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseHeaders {
    pub status: Option<u32>,
    pub content_length: Option<u64>,
    pub content_range: Option<ContentRange>,
    pub content_disposition: Option<String>,
    pub last_modified: Option<String>,
    pub date: Option<String>,
    /// Advertised SHA-256, lowercase hex.
    pub sha256: Option<String>,
}

impl ResponseHeaders {
    /// Parse raw lines, status line first. Unknown headers are ignored.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut h = ResponseHeaders::default();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with("HTTP/") {
                h.status = line.split_whitespace().nth(1).and_then(|c| c.parse().ok());
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                h.content_length = value.parse().ok();
            } else if name.eq_ignore_ascii_case("content-range") {
                h.content_range = ContentRange::parse(value);
            } else if name.eq_ignore_ascii_case("content-disposition") {
                h.content_disposition = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("last-modified") {
                h.last_modified = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("date") {
                h.date = Some(value.to_string());
            } else if h.sha256.is_none() {
                h.sha256 = checksum::expected_sha256(name, value);
            }
        }
        h
    }

    /// Full size of the resource: the Content-Range total, else Content-Length
    /// (plus the range start for partial bodies), else unknown.
    pub fn total_size(&self) -> Option<u64> {
        if let Some(total) = self.content_range.and_then(|r| r.total) {
            return Some(total);
        }
        let offset = self.content_range.and_then(|r| r.start).unwrap_or(0);
        self.content_length.map(|len| len + offset)
    }

    /// Timestamp to stamp on the finished file.
    pub fn modified_time(&self) -> Option<&str> {
        self.last_modified.as_deref().or(self.date.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn content_range_forms() {
        assert_eq!(
            ContentRange::parse("bytes 100-199/1000"),
            Some(ContentRange { start: Some(100), total: Some(1000) })
        );
        assert_eq!(
            ContentRange::parse("bytes */1000"),
            Some(ContentRange { start: None, total: Some(1000) })
        );
        assert_eq!(
            ContentRange::parse("bytes 5-9/*"),
            Some(ContentRange { start: Some(5), total: None })
        );
        assert_eq!(ContentRange::parse("items 1-2/3"), None);
        assert_eq!(ContentRange::parse("bytes x-y/z"), None);
    }

    #[test]
    fn status_and_sizes() {
        let h = ResponseHeaders::parse(&lines(&[
            "HTTP/1.1 206 Partial Content",
            "Content-Length: 900",
            "Content-Range: bytes 100-999/1000",
        ]));
        assert_eq!(h.status, Some(206));
        assert_eq!(h.total_size(), Some(1000));
    }

    #[test]
    fn total_from_length_only() {
        let h = ResponseHeaders::parse(&lines(&["HTTP/2 200", "content-length: 42"]));
        assert_eq!(h.status, Some(200));
        assert_eq!(h.total_size(), Some(42));
        let h = ResponseHeaders::parse(&lines(&[
            "HTTP/1.1 206 Partial Content",
            "Content-Length: 10",
            "Content-Range: bytes 90-99/*",
        ]));
        assert_eq!(h.total_size(), Some(100));
    }

    #[test]
    fn unsized_body() {
        let h = ResponseHeaders::parse(&lines(&["HTTP/1.1 200 OK", "Transfer-Encoding: chunked"]));
        assert_eq!(h.total_size(), None);
    }

    #[test]
    fn metadata_headers() {
        let h = ResponseHeaders::parse(&lines(&[
            "HTTP/1.1 200 OK",
            "Date: Mon, 02 Jan 2023 10:00:00 GMT",
            "Content-Disposition: attachment; filename=\"a.txt\"",
            "X-Checksum-Sha256: 5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03",
        ]));
        assert_eq!(h.modified_time(), Some("Mon, 02 Jan 2023 10:00:00 GMT"));
        assert!(h.content_disposition.as_deref().unwrap().contains("a.txt"));
        assert!(h.sha256.as_deref().unwrap().starts_with("5891b5"));

        let h = ResponseHeaders::parse(&lines(&[
            "Date: Mon, 02 Jan 2023 10:00:00 GMT",
            "Last-Modified: Sun, 01 Jan 2023 08:00:00 GMT",
        ]));
        assert_eq!(h.modified_time(), Some("Sun, 01 Jan 2023 08:00:00 GMT"));
    }
}
