//! PCX Patcher: streaming patch and generation tool for print-management
//! export files.
//!
//! Exports from the target system are line-oriented text files of `ADD
//! <SECTION>` stanzas that can run to hundreds of megabytes. This crate
//! generates new destination/rule stanzas and splices them into an existing
//! export without ever holding the file in memory.
//!
//! # Architecture
//!
//! The patch pipeline is four independent pieces a caller sequences:
//!
//! - [`scan`] finds the byte offset where new blocks of a section belong
//! - [`backup`] snapshots the file with a verified, timestamped copy
//! - [`splice`] streams the file through a temp file with the block inserted
//!   and publishes it with an atomic rename
//! - [`validate`] reports structural issues without touching the file
//!
//! [`template`] builds the stanza text, [`mappings`] holds the site tables,
//! and [`schema`] models blocks for inspection. All file copies go through
//! [`stream`] in fixed-size chunks.
//!
//! # Safety
//!
//! - The original file is byte-identical until the final atomic rename
//! - A patch is only attempted after a verified backup exists
//! - Copies are binary-safe; bytes outside the insertion are never re-encoded
//! - Every failure path leaves either the pre-patch or the fully-patched file
//!
//! # Example
//!
//! ```no_run
//! use pcx_patcher::{backup, scan, splice};
//!
//! # fn main() -> anyhow::Result<()> {
//! let file = "exports/pcx_export.txt";
//! let outcome = scan::locate_insertion_point(file, "RULE")?;
//! let offset = outcome.offset_or_end(std::fs::metadata(file)?.len());
//!
//! let receipt = backup::backup(file)?;
//! println!("backup at {}", receipt.backup_path.display());
//!
//! splice::Splice::new(file, offset, "ADD RULE\n    SEQUENCE                  = 23").apply()?;
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod mappings;
pub mod scan;
pub mod schema;
pub mod splice;
pub mod stream;
pub mod template;
pub mod validate;

// Re-exports
pub use backup::{backup, backup_into, BackupError, BackupReceipt};
pub use mappings::{BookConfig, Mappings, MappingsError};
pub use scan::{locate_insertion_point, ScanError, ScanOutcome};
pub use schema::{parse_blocks, section_counts, Block, SchemaError};
pub use splice::{Splice, SpliceError, SpliceReport, SEPARATOR};
pub use stream::{CopyStats, DEFAULT_CHUNK_SIZE};
pub use template::{
    commitment_rule, consolidated_tax_rules, folder_destination, printer_destination,
    BlockBuilder, CommitmentRule, PrinterDestination,
};
pub use validate::{validate_file, Issue, ValidateError};
