//! Section scanner: finds where new blocks belong inside an export file.
//!
//! The scanner streams the file line-by-line with a single reusable buffer
//! and never materializes the whole file, so a multi-hundred-MB export costs
//! the same memory as a small one. Section regions are recognized by marker
//! lines (`ADD <NAME>`), not by indentation — indentation in vendor exports
//! is not reliable enough to distinguish nesting.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Reserved keyword that introduces a block in the export format.
pub const MARKER_KEYWORD: &[u8] = b"ADD";

/// Sub-block names that continue an enclosing section rather than ending it.
///
/// This is a closed set: a marker line whose name appears here never
/// terminates the region being scanned. `RULECOMPONENT` blocks nest under
/// `RULE`, `INDEXFIELD` under `INDEXTEMPLATE`.
pub const CONTINUATION_SECTIONS: &[&str] = &["RULECOMPONENT", "INDEXFIELD"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("I/O error while scanning: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of an insertion-point search.
///
/// `NotFound` is a degenerate outcome, not an error: the caller decides
/// whether to append at end-of-file or ask the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Byte offset immediately after the last region of the target section,
    /// aligned to the start of the next top-level marker line (or EOF).
    Found { offset: u64 },
    /// The target section never occurs in the file.
    NotFound,
}

impl ScanOutcome {
    /// Resolve to a concrete offset, falling back to `file_len` (append at
    /// end) when the section was never found.
    pub fn offset_or_end(self, file_len: u64) -> u64 {
        match self {
            ScanOutcome::Found { offset } => offset,
            ScanOutcome::NotFound => file_len,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    InTarget,
}

/// Locate the byte offset where new blocks of `target_section` should be
/// inserted: immediately after the *last* occurrence of that section, before
/// the next unrelated top-level marker line.
///
/// Marker lines are classified on trimmed bytes (`ADD` + whitespace + name);
/// continuation sub-blocks from [`CONTINUATION_SECTIONS`] stay inside the
/// region. Comment lines (`*`) and blank lines never change state. The
/// returned offset is always a line boundary.
pub fn locate_insertion_point(
    path: impl AsRef<Path>,
    target_section: &str,
) -> Result<ScanOutcome, ScanError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScanError::NotFound(path.display().to_string()),
        _ => ScanError::Io(e),
    })?;

    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    let mut state = ScanState::Outside;
    let mut line_start: u64 = 0;
    let mut last_end: Option<u64> = None;

    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }

        if let Some(name) = marker_name(&line) {
            match state {
                ScanState::Outside if name == target_section.as_bytes() => {
                    state = ScanState::InTarget;
                }
                ScanState::InTarget => {
                    if name != target_section.as_bytes() && !is_continuation(name) {
                        // First marker past the region: region ends here.
                        last_end = Some(line_start);
                        state = ScanState::Outside;
                    }
                }
                ScanState::Outside => {}
            }
        }

        line_start += n as u64;
    }

    // Region ran to end-of-file.
    if state == ScanState::InTarget {
        last_end = Some(line_start);
    }

    Ok(match last_end {
        Some(offset) => ScanOutcome::Found { offset },
        None => ScanOutcome::NotFound,
    })
}

/// Extract the section name from a marker line, if the line is one.
///
/// Leading whitespace is stripped before matching so nested (indented)
/// markers are still classified; nesting is resolved by name, not margin.
fn marker_name(line: &[u8]) -> Option<&[u8]> {
    let trimmed = trim_start(line);
    let rest = trimmed.strip_prefix(MARKER_KEYWORD)?;
    // Keyword must be followed by whitespace, not be a prefix of a longer word.
    let rest = match rest.first() {
        Some(b' ') | Some(b'\t') => trim_start(rest),
        _ => return None,
    };
    let end = rest
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(&rest[..end])
}

fn is_continuation(name: &[u8]) -> bool {
    CONTINUATION_SECTIONS.iter().any(|s| s.as_bytes() == name)
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| *b != b' ' && *b != b'\t')
        .unwrap_or(bytes.len());
    &bytes[start..]
}
