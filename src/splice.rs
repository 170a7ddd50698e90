//! Streaming patcher: splices block text into an export file at a byte
//! offset without loading the file into memory.
//!
//! The result is published with a tempfile in the source's own directory plus
//! an atomic rename, so there is never a window where the target path holds a
//! half-written file: it is either the original or the fully patched result.

use crate::stream::{self, CopyStats, DEFAULT_CHUNK_SIZE};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Blank-line separator written on both sides of the inserted block, so the
/// patched file keeps blank lines between top-level blocks.
pub const SEPARATOR: &[u8] = b"\n\n";

#[derive(Error, Debug)]
pub enum SpliceError {
    #[error("source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("source path has no parent directory: {0}")]
    NoParentDir(PathBuf),

    #[error("I/O error while patching: {0}")]
    Io(#[from] io::Error),

    #[error("failed to replace {path}: {source}")]
    Replace {
        path: PathBuf,
        source: io::Error,
    },
}

/// A pending insertion of block text into a file at a byte offset.
///
/// The block is opaque bytes to the patcher; it is written verbatim between
/// two [`SEPARATOR`]s. The displaced original must already have been
/// preserved by the backup manager — `apply` does not re-copy it anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Splice does nothing until apply() is called"]
pub struct Splice {
    /// Target file (patched in place via atomic replace).
    pub file: PathBuf,
    /// Byte offset to insert at; clamped to file length (append) when past EOF.
    pub offset: u64,
    /// Block text to insert verbatim.
    pub block: Vec<u8>,
    chunk_size: usize,
}

/// Accounting for a completed splice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpliceReport {
    /// Offset actually used (after clamping to file length).
    pub offset: u64,
    /// Length of the result file.
    pub result_len: u64,
    /// Stats for the two streamed copies (head + tail of the source).
    pub copy_stats: CopyStats,
}

impl Splice {
    pub fn new(file: impl Into<PathBuf>, offset: u64, block: impl Into<Vec<u8>>) -> Self {
        Self {
            file: file.into(),
            offset,
            block: block.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the streaming chunk size. Used by tests to make chunk counts
    /// observable on small fixtures; production callers keep the default.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Apply the splice: `source[..offset] ++ sep ++ block ++ sep ++
    /// source[offset..]`, byte for byte.
    ///
    /// The copy is binary-safe; bytes outside the insertion are never decoded
    /// or re-encoded. On any failure before the final rename the original
    /// file is untouched and the temp file is discarded.
    pub fn apply(&self) -> Result<SpliceReport, SpliceError> {
        let metadata = self.file.metadata().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SpliceError::SourceMissing(self.file.clone()),
            _ => SpliceError::Io(e),
        })?;
        let source_len = metadata.len();
        let offset = self.offset.min(source_len);

        let parent = match self.file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            Some(_) => Path::new("."),
            None => return Err(SpliceError::NoParentDir(self.file.clone())),
        };

        // Temp file in the same directory so the final rename stays on one
        // filesystem and is atomic.
        let temp = tempfile::NamedTempFile::new_in(parent)?;
        let mut source = File::open(&self.file)?;
        let mut writer = BufWriter::new(temp);

        let head = stream::copy_limited(&mut source, &mut writer, offset, self.chunk_size)?;
        writer.write_all(SEPARATOR)?;
        writer.write_all(&self.block)?;
        writer.write_all(SEPARATOR)?;
        let tail = stream::copy_to_end(&mut source, &mut writer, self.chunk_size)?;

        let temp = writer
            .into_inner()
            .map_err(|e| SpliceError::Io(e.into_error()))?;
        temp.as_file().sync_all()?;

        temp.persist(&self.file).map_err(|e| SpliceError::Replace {
            path: self.file.clone(),
            source: e.error,
        })?;

        Ok(SpliceReport {
            offset,
            result_len: source_len + (SEPARATOR.len() * 2 + self.block.len()) as u64,
            copy_stats: head.merge(tail),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn splice_file(content: &[u8], offset: u64, block: &[u8]) -> (TempDir, Vec<u8>, SpliceReport) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.txt");
        fs::write(&path, content).unwrap();
        let report = Splice::new(&path, offset, block).apply().unwrap();
        let result = fs::read(&path).unwrap();
        (dir, result, report)
    }

    #[test]
    fn splice_at_midpoint() {
        let (_d, result, report) = splice_file(b"headtail", 4, b"BLOCK");
        assert_eq!(result, b"head\n\nBLOCK\n\ntail");
        assert_eq!(report.offset, 4);
        assert_eq!(report.result_len, result.len() as u64);
    }

    #[test]
    fn splice_empty_file() {
        let (_d, result, _) = splice_file(b"", 0, b"ADD RULE\n    X=1");
        assert_eq!(result, b"\n\nADD RULE\n    X=1\n\n");
    }

    #[test]
    fn offset_past_eof_appends() {
        let (_d, result, report) = splice_file(b"content", 500, b"B");
        assert_eq!(result, b"content\n\nB\n\n");
        assert_eq!(report.offset, 7);
    }

    #[test]
    fn binary_regions_survive_untouched() {
        let content = b"\x00\x01\xfe\xffmiddle\x80\x81";
        let (_d, result, _) = splice_file(content, 4, b"X");
        assert_eq!(result, b"\x00\x01\xfe\xff\n\nX\n\nmiddle\x80\x81");
    }

    #[test]
    fn chunked_copy_is_observable() {
        let content = vec![b'a'; 100];
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.txt");
        fs::write(&path, &content).unwrap();

        let report = Splice::new(&path, 50, b"B")
            .with_chunk_size(8)
            .apply()
            .unwrap();
        assert_eq!(report.copy_stats.bytes, 100);
        // 50 bytes head + 50 bytes tail at 8-byte chunks.
        assert_eq!(report.copy_stats.chunks, 7 + 7);
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = TempDir::new().unwrap();
        let result = Splice::new(dir.path().join("nope.txt"), 0, b"B").apply();
        assert!(matches!(result, Err(SpliceError::SourceMissing(_))));
    }
}
