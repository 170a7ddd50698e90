use std::io::{self, Read, Write};

/// Default chunk size for streaming copies: 10 MiB.
///
/// Large enough to keep syscall overhead low on multi-hundred-MB exports,
/// small enough that peak memory stays flat regardless of file size.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Accounting for a chunked copy, used to assert bounded-memory behaviour
/// in tests and to report progress in the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyStats {
    /// Total bytes transferred.
    pub bytes: u64,
    /// Number of read calls that returned data.
    pub chunks: u64,
}

impl CopyStats {
    pub fn merge(self, other: CopyStats) -> CopyStats {
        CopyStats {
            bytes: self.bytes + other.bytes,
            chunks: self.chunks + other.chunks,
        }
    }
}

/// Copy up to `limit` bytes from `reader` to `writer` in fixed-size chunks.
///
/// The buffer is allocated once at `chunk_size` and reused for every read,
/// so auxiliary memory is O(chunk_size) regardless of `limit`. Returns the
/// stats for the copy; `stats.bytes` is less than `limit` when the reader
/// reached EOF early.
pub fn copy_limited(
    reader: &mut impl Read,
    writer: &mut impl Write,
    limit: u64,
    chunk_size: usize,
) -> io::Result<CopyStats> {
    let mut buf = vec![0u8; chunk_size];
    let mut stats = CopyStats::default();
    let mut remaining = limit;

    while remaining > 0 {
        let want = remaining.min(chunk_size as u64) as usize;
        let n = reader.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        stats.bytes += n as u64;
        stats.chunks += 1;
        remaining -= n as u64;
    }

    Ok(stats)
}

/// Copy from `reader` to `writer` until EOF in fixed-size chunks.
pub fn copy_to_end(
    reader: &mut impl Read,
    writer: &mut impl Write,
    chunk_size: usize,
) -> io::Result<CopyStats> {
    copy_limited(reader, writer, u64::MAX, chunk_size)
}
