//! Sequential chunk writer for temp download files.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// How to open the temp file for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Continue after the bytes already on disk.
    Append,
    /// Start from zero, discarding anything present.
    Truncate,
}

/// Buffered writer over a temp file. Every chunk is flushed to the OS before
/// `write_chunk` returns, so the on-disk size always matches bytes accepted.
pub struct ChunkWriter {
    inner: BufWriter<File>,
    written: u64,
}

impl ChunkWriter {
    pub fn open(temp_path: &Path, mode: OpenMode, buffer_size: usize) -> io::Result<Self> {
        let mut opts = File::options();
        opts.create(true);
        match mode {
            OpenMode::Append => opts.append(true),
            OpenMode::Truncate => opts.write(true).truncate(true),
        };
        let file = opts.open(temp_path)?;
        let existing = match mode {
            OpenMode::Append => file.metadata()?.len(),
            OpenMode::Truncate => 0,
        };
        Ok(Self {
            inner: BufWriter::with_capacity(buffer_size.max(1), file),
            written: existing,
        })
    }

    pub fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data)?;
        self.inner.flush()?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Total bytes in the file, including what was there before opening.
    pub fn len(&self) -> u64 {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Flush and close; returns the final size.
    pub fn close(mut self) -> io::Result<u64> {
        self.inner.flush()?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_continues_after_existing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("f.tmp");
        std::fs::write(&p, b"hello ").unwrap();
        let mut w = ChunkWriter::open(&p, OpenMode::Append, 8).unwrap();
        assert_eq!(w.len(), 6);
        w.write_chunk(b"world").unwrap();
        assert_eq!(std::fs::metadata(&p).unwrap().len(), 11);
        assert_eq!(w.close().unwrap(), 11);
        assert_eq!(std::fs::read(&p).unwrap(), b"hello world");
    }

    #[test]
    fn truncate_discards_existing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("f.tmp");
        std::fs::write(&p, b"stale data").unwrap();
        let mut w = ChunkWriter::open(&p, OpenMode::Truncate, 1024).unwrap();
        assert!(w.is_empty());
        w.write_chunk(b"new").unwrap();
        w.close().unwrap();
        assert_eq!(std::fs::read(&p).unwrap(), b"new");
    }

    #[test]
    fn creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("fresh.tmp");
        let w = ChunkWriter::open(&p, OpenMode::Append, 1024).unwrap();
        assert_eq!(w.close().unwrap(), 0);
        assert!(p.exists());
    }
}
