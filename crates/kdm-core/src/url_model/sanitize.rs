//! Filesystem-safe filename sanitization.

const NAME_MAX: usize = 255;

/// Sanitizes a candidate filename so it names exactly one file in one directory.
///
/// - Trims surrounding whitespace (tabs and newlines included)
/// - Replaces NUL, `/`, `\` and remaining control characters with `_`
/// - A name of only dots becomes empty
/// - Limits length to 255 bytes (NAME_MAX), keeping the extension when possible
///
/// Inner spaces and non-ASCII characters are kept as-is.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .trim()
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    if replaced.chars().all(|c| c == '.') {
        return String::new();
    }
    truncate_keep_extension(&replaced, NAME_MAX)
}

fn truncate_keep_extension(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(i) if i > 0 && name.len() - i <= 16 => name.split_at(i),
        _ => (name, ""),
    };
    let mut take = max - ext.len();
    while take > 0 && !stem.is_char_boundary(take) {
        take -= 1;
    }
    format!("{}{}", &stem[..take], ext)
}
