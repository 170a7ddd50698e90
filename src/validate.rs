//! Structural validation of export files.
//!
//! This is a reporting pass only: it never mutates the file and never treats
//! a structural problem as an error. Only I/O failures are errors; everything
//! else comes back as an ordered list of issues for the operator to weigh.
//! Validation does not gate patching — callers sequence the two as they wish.

use crate::stream::DEFAULT_CHUNK_SIZE;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Section markers an importable export is expected to contain.
pub const REQUIRED_MARKERS: &[&str] = &["ADD DESTINATION", "ADD RULE", "ADD RULESET"];

/// Longest line the target system accepts.
pub const MAX_LINE_LENGTH: usize = 255;

/// Files smaller than this cannot be a real export.
pub const MIN_FILE_SIZE: u64 = 100;

/// Per-line checks stop after this many lines; the marker scan still covers
/// the whole file.
pub const LINE_CHECK_LIMIT: usize = 10_000;

const LARGE_FILE_WARN_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error while validating: {0}")]
    Io(#[from] io::Error),
}

/// A single structural finding, ordered as encountered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    MissingSection { marker: String },
    FileTooSmall { bytes: u64 },
    FileVeryLarge { megabytes: u64 },
    LineTooLong { line: usize, length: usize },
    BadIndentation { line: usize },
    BadKeyValue { line: usize },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingSection { marker } => write!(f, "missing required section: {marker}"),
            Issue::FileTooSmall { bytes } => write!(f, "file too small: {bytes} bytes"),
            Issue::FileVeryLarge { megabytes } => {
                write!(f, "file very large ({megabytes} MB) - import may be slow")
            }
            Issue::LineTooLong { line, length } => {
                write!(
                    f,
                    "line {line} exceeds max length ({length} > {MAX_LINE_LENGTH})"
                )
            }
            Issue::BadIndentation { line } => {
                write!(f, "line {line}: invalid indentation inside block")
            }
            Issue::BadKeyValue { line } => {
                write!(f, "line {line}: invalid key-value format")
            }
        }
    }
}

/// Validate the structure of an export file.
///
/// Returns the issues found; an empty vec means no issues. The file is only
/// ever read.
pub fn validate_file(path: impl AsRef<Path>) -> Result<Vec<Issue>, ValidateError> {
    let path = path.as_ref();
    let metadata = path.metadata().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ValidateError::NotFound(path.to_path_buf()),
        _ => ValidateError::Io(e),
    })?;

    let mut issues = Vec::new();

    if metadata.len() < MIN_FILE_SIZE {
        issues.push(Issue::FileTooSmall {
            bytes: metadata.len(),
        });
    }
    if metadata.len() > LARGE_FILE_WARN_BYTES {
        issues.push(Issue::FileVeryLarge {
            megabytes: metadata.len() / (1024 * 1024),
        });
    }

    issues.extend(line_checks(File::open(path)?)?);

    for marker in missing_markers(File::open(path)?)? {
        issues.push(Issue::MissingSection {
            marker: marker.to_string(),
        });
    }

    Ok(issues)
}

/// Per-line structural checks over the first [`LINE_CHECK_LIMIT`] lines.
fn line_checks(file: File) -> io::Result<Vec<Issue>> {
    let mut issues = Vec::new();
    let mut reader = BufReader::new(file);
    let mut raw = Vec::new();
    let mut in_block = false;

    for line_num in 1..=LINE_CHECK_LIMIT {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches(['\n', '\r']);

        if line.len() > MAX_LINE_LENGTH {
            issues.push(Issue::LineTooLong {
                line: line_num,
                length: line.len(),
            });
        }

        if is_marker_line(line) {
            in_block = true;
            continue;
        }

        if in_block && !line.trim().is_empty() && !line.starts_with("    ") {
            // A non-indented line inside a block must be a comment.
            if !line.starts_with('*') {
                issues.push(Issue::BadIndentation { line: line_num });
            }
        }

        if in_block && line.contains('=') && !is_well_formed_field(line) {
            issues.push(Issue::BadKeyValue { line: line_num });
        }
    }

    Ok(issues)
}

fn is_marker_line(line: &str) -> bool {
    line.strip_prefix("ADD")
        .is_some_and(|rest| rest.starts_with(' ') && !rest.trim().is_empty())
}

/// `    KEY<spaces>= <value>` with at least a four-space margin and padding
/// around the separator.
fn is_well_formed_field(line: &str) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent < 4 {
        return false;
    }
    let body = &line[indent..];
    let Some((key, value)) = body.split_once('=') else {
        return false;
    };
    let key_name = key.trim_end();
    !key_name.is_empty()
        && !key_name.contains(char::is_whitespace)
        && key.ends_with(' ')
        && value.starts_with(' ')
}

/// Stream the whole file in fixed chunks looking for the required markers.
///
/// A match can straddle a chunk boundary, so the tail of each window is
/// carried over into the next one.
fn missing_markers(file: File) -> io::Result<Vec<&'static str>> {
    let longest = REQUIRED_MARKERS.iter().map(|m| m.len()).max().unwrap_or(0);

    let mut found = [false; 3];
    let mut reader = BufReader::with_capacity(DEFAULT_CHUNK_SIZE.min(1024 * 1024), file);
    let mut window: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        window.extend_from_slice(&chunk[..n]);

        for (i, marker) in REQUIRED_MARKERS.iter().enumerate() {
            if !found[i] && contains(&window, marker.as_bytes()) {
                found[i] = true;
            }
        }
        if found.iter().all(|f| *f) {
            return Ok(Vec::new());
        }

        // Keep just enough tail to complete a straddling match.
        let keep = longest.saturating_sub(1).min(window.len());
        window.drain(..window.len() - keep);
    }

    Ok(REQUIRED_MARKERS
        .iter()
        .enumerate()
        .filter(|(i, _)| !found[*i])
        .map(|(_, m)| *m)
        .collect())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn validate_str(content: &str) -> Vec<Issue> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.txt");
        fs::write(&path, content).unwrap();
        validate_file(&path).unwrap()
    }

    fn padded(content: &str) -> String {
        // Trailing comment lines keep MIN_FILE_SIZE from tripping.
        let mut s = content.to_string();
        while s.len() < MIN_FILE_SIZE as usize {
            s.push_str("* padding\n");
        }
        s
    }

    #[test]
    fn clean_file_has_no_issues() {
        let content = padded(
            "ADD DESTINATION\n    NAME                      = x\n\n\
             ADD RULESET\n    NAME                      = r\n\n\
             ADD RULE\n    RULESETNAME               = r\n",
        );
        assert!(validate_str(&content).is_empty());
    }

    #[test]
    fn missing_sections_are_reported_not_fatal() {
        let issues = validate_str(&padded("ADD DESTINATION\n    NAME                  = x\n"));
        assert!(issues.contains(&Issue::MissingSection {
            marker: "ADD RULE".to_string()
        }));
        assert!(issues.contains(&Issue::MissingSection {
            marker: "ADD RULESET".to_string()
        }));
    }

    #[test]
    fn tiny_file_is_flagged() {
        let issues = validate_str("x");
        assert!(matches!(issues[0], Issue::FileTooSmall { bytes: 1 }));
    }

    #[test]
    fn overlong_line_is_flagged() {
        let long = format!("ADD RULE\n    KEY                       = {}\n", "v".repeat(300));
        let issues = validate_str(&padded(&long));
        assert!(issues
            .iter()
            .any(|i| matches!(i, Issue::LineTooLong { line: 2, .. })));
    }

    #[test]
    fn bad_indentation_inside_block() {
        let issues = validate_str(&padded("ADD RULE\n  KEY = v\n"));
        assert!(issues
            .iter()
            .any(|i| matches!(i, Issue::BadIndentation { line: 2 })));
    }

    #[test]
    fn comment_lines_are_allowed_inside_blocks() {
        let issues = validate_str(&padded(
            "ADD RULE\n* a comment\n    KEY                       = v\n",
        ));
        assert!(!issues
            .iter()
            .any(|i| matches!(i, Issue::BadIndentation { .. })));
    }

    #[test]
    fn malformed_key_value_is_flagged() {
        let issues = validate_str(&padded("ADD RULE\n    KEY=value\n"));
        assert!(issues
            .iter()
            .any(|i| matches!(i, Issue::BadKeyValue { line: 2 })));
    }

    #[test]
    fn nested_component_fields_are_well_formed() {
        let issues = validate_str(&padded(
            "ADD RULE\n    ADD RULECOMPONENT\n        VARIABLE              = &RPT_COMPANY\n",
        ));
        assert!(!issues.iter().any(|i| matches!(i, Issue::BadKeyValue { .. })));
    }

    #[test]
    fn issues_render_human_readable() {
        let issue = Issue::MissingSection {
            marker: "ADD RULE".to_string(),
        };
        assert_eq!(issue.to_string(), "missing required section: ADD RULE");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = validate_file(dir.path().join("nope.txt"));
        assert!(matches!(result, Err(ValidateError::NotFound(_))));
    }
}
