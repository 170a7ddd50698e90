//! Block-level model of an export file.
//!
//! Parses the line-oriented format into typed blocks for inspection and
//! statistics. Nested sub-blocks are folded into their parent's field list;
//! the patcher never goes through this model — it treats files as bytes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Canonical ordering of top-level sections in an export, as the target
/// system emits them.
pub const SECTION_ORDER: &[&str] = &[
    "PRINTSERVER",
    "RETENTIONPOLICY",
    "INDEXTEMPLATE",
    "INDEXFIELD",
    "TEMPLATELOCATION",
    "DESTINATION",
    "RULESET",
    "RULE",
    "REPORTDEFN",
    "VARIABLE",
];

/// Rank of a section in [`SECTION_ORDER`]; unknown sections sort last.
pub fn section_rank(section: &str) -> usize {
    SECTION_ORDER
        .iter()
        .position(|s| *s == section)
        .unwrap_or(SECTION_ORDER.len())
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("I/O error while parsing blocks: {0}")]
    Io(#[from] std::io::Error),
}

/// One `ADD <TYPE>` block with its key/value fields in file order.
///
/// Keys can repeat (`DESTINATIONNAME` legitimately appears twice in a rule),
/// so fields are an ordered list, not a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub block_type: String,
    pub fields: Vec<(String, String)>,
}

impl Block {
    /// First value for `key`, if present.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse an export file into blocks, streaming line-by-line.
///
/// Comments (`*`) and blank lines are skipped. A marker line at any
/// indentation starts a new block, matching how the target system reads the
/// format back in.
pub fn parse_blocks(path: impl AsRef<Path>) -> Result<Vec<Block>, SchemaError> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);
    let mut raw = Vec::new();

    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim_start();

        if trimmed.is_empty() || trimmed.starts_with('*') {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("ADD ") {
            let block_type = rest.trim().to_string();
            if !block_type.is_empty() {
                if let Some(done) = current.take() {
                    blocks.push(done);
                }
                current = Some(Block {
                    block_type,
                    fields: Vec::new(),
                });
                continue;
            }
        }

        if let (Some(block), Some((key, value))) = (current.as_mut(), trimmed.split_once('=')) {
            block
                .fields
                .push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    if let Some(done) = current {
        blocks.push(done);
    }

    Ok(blocks)
}

/// Count blocks per section type, ordered by [`SECTION_ORDER`] rank.
pub fn section_counts(blocks: &[Block]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for block in blocks {
        *counts.entry(block.block_type.as_str()).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.sort_by_key(|(name, _)| section_rank(name));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse_str(content: &str) -> Vec<Block> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.txt");
        fs::write(&path, content).unwrap();
        parse_blocks(&path).unwrap()
    }

    #[test]
    fn parses_blocks_and_fields() {
        let blocks = parse_str(
            "* header comment\n\
             ADD DESTINATION\n    NAME                      = /Reports/X/\n    TYPE                      = Folder\n\n\
             ADD RULE\n    RULESETNAME               = R1\n",
        );
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].block_type, "DESTINATION");
        assert_eq!(blocks[0].field("NAME"), Some("/Reports/X/"));
        assert_eq!(blocks[1].field("RULESETNAME"), Some("R1"));
    }

    #[test]
    fn repeated_keys_are_kept_in_order() {
        let blocks = parse_str(
            "ADD RULE\n    DESTINATIONNAME           = /Reports/A/\n    DESTINATIONNAME           = Q~STORE1~001\n",
        );
        assert_eq!(blocks[0].fields.len(), 2);
        assert_eq!(blocks[0].field("DESTINATIONNAME"), Some("/Reports/A/"));
    }

    #[test]
    fn nested_components_become_their_own_blocks() {
        let blocks = parse_str(
            "ADD RULE\n    RULESETNAME               = R\n    ADD RULECOMPONENT\n        VARIABLE              = &RPT_COMPANY\n",
        );
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].block_type, "RULECOMPONENT");
        assert_eq!(blocks[1].field("VARIABLE"), Some("&RPT_COMPANY"));
    }

    #[test]
    fn counts_follow_section_order() {
        let blocks = parse_str(
            "ADD RULE\n    A = 1\nADD DESTINATION\n    B = 2\nADD RULE\n    C = 3\n",
        );
        let counts = section_counts(&blocks);
        assert_eq!(
            counts,
            vec![("DESTINATION".to_string(), 1), ("RULE".to_string(), 2)]
        );
    }

    #[test]
    fn unknown_sections_sort_last() {
        assert!(section_rank("RULE") < section_rank("SOMETHINGELSE"));
    }
}
