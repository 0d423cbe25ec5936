//! Filename extraction from the server-relative path.

use super::content_disposition::percent_decode;

/// Extracts the last segment of a server path such as `/data/ab/cd/abcd.png`,
/// percent-decoded. Query and fragment are ignored; an absolute URL works too.
///
/// Returns `None` if the path is empty, the root, or ends in `.`/`..`.
pub fn filename_from_server_path(server_path: &str) -> Option<String> {
    let base = url::Url::parse("http://server.invalid/").ok()?;
    let parsed = base.join(server_path).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode(segment);
    if decoded.is_empty() || decoded == "." || decoded == ".." {
        return None;
    }
    Some(decoded)
}
