//! SHA-256 helpers: file digests and server-advertised digest headers.
//!
//! Digests are computed after the transfer completes, not inline with the
//! write path.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// SHA-256 of everything readable from `r`, as lowercase hex.
pub fn sha256_reader<R: Read>(mut r: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    sha256_reader(f).with_context(|| format!("read {}", path.display()))
}

/// Expected SHA-256 (lowercase hex) from one response header, if the header
/// carries one. Recognized forms:
///
/// - `Digest: sha-256=<base64>` (possibly among other algorithms)
/// - `Repr-Digest: sha-256=:<base64>:`
/// - `X-Checksum-Sha256: <hex>`
pub fn expected_sha256(name: &str, value: &str) -> Option<String> {
    if name.eq_ignore_ascii_case("x-checksum-sha256") {
        let v = value.trim();
        return (v.len() == 64 && v.bytes().all(|b| b.is_ascii_hexdigit()))
            .then(|| v.to_ascii_lowercase());
    }
    if !name.eq_ignore_ascii_case("digest") && !name.eq_ignore_ascii_case("repr-digest") {
        return None;
    }
    value.split(',').find_map(|item| {
        let (alg, encoded) = item.trim().split_once('=')?;
        if !alg.trim().eq_ignore_ascii_case("sha-256") {
            return None;
        }
        let bytes = STANDARD.decode(encoded.trim().trim_matches(':')).ok()?;
        (bytes.len() == 32).then(|| hex::encode(bytes))
    })
}
