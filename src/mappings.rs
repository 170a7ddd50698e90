//! Mapping registry: queues, commitment books, and tax-report jobs.
//!
//! Built-in defaults cover the production environment; an optional TOML file
//! overrides them per site. The registry is constructed once at startup and
//! passed by reference — nothing here is global.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MappingsError {
    #[error("failed to read mappings from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse mappings TOML: {0}")]
    Toml(#[from] toml_edit::de::Error),
}

/// Configuration of a single commitment book.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BookConfig {
    /// Report variable the rule components compare against.
    pub variable: String,
    /// Print queue the book's output routes to.
    pub queue: String,
}

/// Site mapping tables, deserializable from TOML.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Mappings {
    /// Queue name → print server printer name.
    pub queues: BTreeMap<String, String>,
    /// Commitment book name → book configuration.
    pub commitment_books: BTreeMap<String, BookConfig>,
    /// Tax report name → report jobs it fans out to.
    pub tax_report_jobs: BTreeMap<String, Vec<String>>,
}

impl Default for Mappings {
    fn default() -> Self {
        let queues = [("OPW2", "OPW2"), ("DFLTJ", "HELD_KONICA")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let commitment_books = [
            ("PBKOC01R", "&RPT_R001C002L004", "OPW2"),
            ("PDEOC91R", "&RPT_R005C002L004", "OPW2"),
            ("PDEOC01R", "&RPT_R005C002L004", "OPW2"),
            ("PDIOC91R", "&RPT_R001C002L004", "OPW2"),
            ("PFROC91R", "&RPT_R005C002L004", "OPW2"),
            ("PGMOC91R", "&RPT_R005C002L004", "OPW2"),
            ("PGROC01R", "&RPT_R005C002L004", "DFLTJ"),
            ("PMTOC91R", "&RPT_R001C002L004", "OPW2"),
            ("PPROC91R", "&RPT_R005C002L004", "OPW2"),
        ]
        .into_iter()
        .map(|(name, variable, queue)| {
            (
                name.to_string(),
                BookConfig {
                    variable: variable.to_string(),
                    queue: queue.to_string(),
                },
            )
        })
        .collect();

        let tax_report_jobs = [
            (
                "TAX001",
                vec![
                    "PPA0771R", "PPA0950W", "PPA1545R", "PPA1545X", "PPA8920R", "PPA9999R",
                ],
            ),
            ("TAX001AD", vec!["PPA1545R", "PPA1545X"]),
            ("TAX001FF", vec!["PPA1545R", "PPA1545X"]),
            ("TAX004", vec!["PPA0951W"]),
            ("TAX010", vec!["PPA0951W"]),
            ("TAX010FD", vec!["PPA0951W", "PPA8905R"]),
            ("TAX010FT", vec!["PPA0951W", "PPA8955R"]),
            ("TAX010HA", vec!["PPA0951W", "PPA8906R"]),
            ("TAX010ST", vec!["PPA0951W", "PPA8910R"]),
        ]
        .into_iter()
        .map(|(report, jobs)| {
            (
                report.to_string(),
                jobs.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        Self {
            queues,
            commitment_books,
            tax_report_jobs,
        }
    }
}

impl Mappings {
    /// Printer name for a queue; unknown queues print under their own name.
    pub fn printer_name<'a>(&'a self, queue: &'a str) -> &'a str {
        self.queues.get(queue).map(String::as_str).unwrap_or(queue)
    }

    /// Distinct queues referenced by the configured commitment books.
    pub fn book_queues(&self) -> Vec<&str> {
        let mut queues: Vec<&str> = self
            .commitment_books
            .values()
            .map(|b| b.queue.as_str())
            .collect();
        queues.sort_unstable();
        queues.dedup();
        queues
    }
}

pub fn load_from_str(input: &str) -> Result<Mappings, MappingsError> {
    Ok(toml_edit::de::from_str(input)?)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Mappings, MappingsError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| MappingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents)
}
