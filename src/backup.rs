//! Timestamped backups of export files, verified before they count.
//!
//! A patch is never attempted without a prior successful backup, so this
//! module is strict: the copy streams in bounded chunks, the written backup
//! is re-read and hash-checked against the bytes that were streamed, and any
//! failure removes the partial file so it can never be mistaken for a valid
//! snapshot.

use crate::stream::{self, CopyStats, DEFAULT_CHUNK_SIZE};
use chrono::Local;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::Xxh3;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("backup verification failed for {path}: expected xxh3 {expected:016x}, got {actual:016x}")]
    VerificationFailed {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("I/O error during backup: {0}")]
    Io(#[from] io::Error),
}

/// Proof of a completed, verified backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReceipt {
    /// Where the snapshot was written.
    pub backup_path: PathBuf,
    /// Bytes copied (equals the source length at copy time).
    pub bytes: u64,
    /// xxh3 of the copied content, re-verified against the written file.
    pub xxh3: u64,
}

/// Create a verified, timestamped backup of `source` next to it.
pub fn backup(source: impl AsRef<Path>) -> Result<BackupReceipt, BackupError> {
    let source = source.as_ref();
    let parent = source.parent().unwrap_or_else(|| Path::new("."));
    backup_into(source, parent)
}

/// Create a verified backup of `source` inside `backup_dir`.
///
/// Naming: `<stem>_backup_<YYYYMMDD_HHMMSS><suffix>`, with a monotonic `_2`,
/// `_3`, ... suffix when two backups land in the same clock second, so an
/// existing backup is never silently overwritten.
pub fn backup_into(
    source: impl AsRef<Path>,
    backup_dir: impl AsRef<Path>,
) -> Result<BackupReceipt, BackupError> {
    let source = source.as_ref();
    if !source.is_file() {
        return Err(BackupError::SourceMissing(source.to_path_buf()));
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = unique_backup_path(source, backup_dir.as_ref(), &timestamp);

    match copy_and_verify(source, &backup_path) {
        Ok((stats, hash)) => Ok(BackupReceipt {
            backup_path,
            bytes: stats.bytes,
            xxh3: hash,
        }),
        Err(err) => {
            // A half-written file must not survive as an apparent backup.
            let _ = fs::remove_file(&backup_path);
            Err(err)
        }
    }
}

fn unique_backup_path(source: &Path, dir: &Path, timestamp: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let suffix = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let candidate = dir.join(format!("{stem}_backup_{timestamp}{suffix}"));
    if !candidate.exists() {
        return candidate;
    }
    let mut counter = 2u32;
    loop {
        let candidate = dir.join(format!("{stem}_backup_{timestamp}_{counter}{suffix}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn copy_and_verify(source: &Path, dest: &Path) -> Result<(CopyStats, u64), BackupError> {
    let mut reader = HashingReader::new(File::open(source)?);
    let mut writer = File::create(dest)?;

    let stats = stream::copy_to_end(&mut reader, &mut writer, DEFAULT_CHUNK_SIZE)?;
    writer.sync_all()?;
    drop(writer);

    let expected = reader.finish();

    // Re-read what actually hit disk; the receipt vouches for these bytes.
    let mut verify_reader = HashingReader::new(File::open(dest)?);
    let verify_stats = stream::copy_to_end(&mut verify_reader, &mut io::sink(), DEFAULT_CHUNK_SIZE)?;
    let actual = verify_reader.finish();

    if actual != expected || verify_stats.bytes != stats.bytes {
        return Err(BackupError::VerificationFailed {
            path: dest.to_path_buf(),
            expected,
            actual,
        });
    }

    Ok((stats, expected))
}

/// Reader adapter that folds every byte it passes through into an xxh3 state.
struct HashingReader<R> {
    inner: R,
    hasher: Xxh3,
}

impl<R: Read> HashingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Xxh3::new(),
        }
    }

    fn finish(&self) -> u64 {
        self.hasher.digest()
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}
