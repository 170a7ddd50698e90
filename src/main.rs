use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use pcx_patcher::{
    backup, mappings, scan, schema, template, validate, Mappings, ScanOutcome, Splice,
};
use similar::{ChangeTag, TextDiff};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "pcx-patcher")]
#[command(about = "Streaming patch and generation tool for PCX export files", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML file overriding the built-in queue/book/report mappings
    #[arg(long, global = true)]
    mappings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an export file for structural issues (read-only)
    Validate {
        /// Export file to check
        file: PathBuf,
    },

    /// Back up an export, then splice a block file into it
    Insert(InsertArgs),

    /// Generate new configuration stanzas into files
    Generate {
        #[command(subcommand)]
        what: GenerateCommands,
    },

    /// Show per-section block counts for an export
    Stats {
        /// Export file to inspect
        file: PathBuf,
    },
}

#[derive(Args)]
struct InsertArgs {
    /// Export file, or a directory holding exports (newest .txt is used)
    target: PathBuf,

    /// Section type to insert after (e.g. RULE, DESTINATION)
    #[arg(short, long)]
    section: String,

    /// File containing the block text to insert
    #[arg(short, long)]
    block_file: PathBuf,

    /// Directory to write the backup into (default: next to the export)
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// When the section is absent, append at end-of-file instead of failing
    #[arg(long)]
    append_if_missing: bool,

    /// Locate the insertion point and report, without backing up or patching
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show a unified diff of the region around the insertion
    #[arg(short, long)]
    diff: bool,
}

#[derive(Subcommand)]
enum GenerateCommands {
    /// Commitment-book destinations and rules for a store
    Stores(StoresArgs),
    /// Consolidated tax-report rules for a set of companies
    Tax(TaxArgs),
}

#[derive(Args)]
struct StoresArgs {
    /// Store number (4 digits; 3-digit numbers are zero-padded in paths)
    #[arg(long)]
    store: String,

    /// Store name (goes into USERDATA11)
    #[arg(long, default_value = "")]
    name: String,

    /// Street address
    #[arg(long, default_value = "")]
    address: String,

    /// City, state and ZIP
    #[arg(long, default_value = "")]
    city_state_zip: String,

    /// Report the books belong to
    #[arg(long, default_value = "RABOC010")]
    report: String,

    /// Commitment books to generate (default: all configured books)
    #[arg(long, value_delimiter = ',')]
    books: Vec<String>,

    /// Directory the generated files are written into
    #[arg(long, default_value = "generated")]
    out_dir: PathBuf,

    /// Also write a single combined import file
    #[arg(long)]
    combined: bool,
}

#[derive(Args)]
struct TaxArgs {
    /// Company numbers to consolidate
    #[arg(long, value_delimiter = ',', required = true)]
    companies: Vec<String>,

    /// Tax reports to cover (default: every configured report)
    #[arg(long, value_delimiter = ',')]
    reports: Vec<String>,

    /// Directory the generated file is written into
    #[arg(long, default_value = "generated")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mappings = match &cli.mappings {
        Some(path) => mappings::load_from_path(path)
            .with_context(|| format!("loading mappings from {}", path.display()))?,
        None => Mappings::default(),
    };

    match cli.command {
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Insert(args) => cmd_insert(args),
        Commands::Generate { what } => match what {
            GenerateCommands::Stores(args) => cmd_generate_stores(args, &mappings),
            GenerateCommands::Tax(args) => cmd_generate_tax(args, &mappings),
        },
        Commands::Stats { file } => cmd_stats(&file),
    }
}

fn cmd_validate(file: &Path) -> Result<()> {
    println!("Validating {}...", file.display());

    let issues = validate::validate_file(file)?;

    if issues.is_empty() {
        println!("{} No structural issues found", "✓".green());
        return Ok(());
    }

    println!(
        "{} {} ({} issues)",
        "⊙".yellow(),
        "STRUCTURAL ISSUES".yellow().bold(),
        issues.len()
    );
    for issue in &issues {
        println!("  - {issue}");
    }
    println!();
    println!(
        "{}",
        "Issues are advisory; the file was not modified.".dimmed()
    );

    // Structural findings are reported but an unusable report is still a
    // failed validation run for scripting purposes.
    std::process::exit(1);
}

fn cmd_insert(args: InsertArgs) -> Result<()> {
    let file = resolve_export_file(&args.target)?;
    let block = fs::read(&args.block_file)
        .with_context(|| format!("reading block file {}", args.block_file.display()))?;
    if block.is_empty() {
        bail!("block file {} is empty", args.block_file.display());
    }

    // Recommended workflow: validate first, but findings never gate the patch.
    match validate::validate_file(&file) {
        Ok(issues) if issues.is_empty() => {}
        Ok(issues) => {
            eprintln!(
                "{}",
                format!("Warning: {} structural issues in target:", issues.len()).yellow()
            );
            for issue in issues.iter().take(10) {
                eprintln!("  - {issue}");
            }
        }
        Err(e) => bail!("validation pass failed: {e}"),
    }

    let file_len = fs::metadata(&file)?.len();
    let outcome = scan::locate_insertion_point(&file, &args.section)?;

    let offset = match outcome {
        ScanOutcome::Found { offset } => offset,
        ScanOutcome::NotFound if args.append_if_missing => {
            eprintln!(
                "{}",
                format!(
                    "Warning: no {} section found; appending at end of file",
                    args.section
                )
                .yellow()
            );
            file_len
        }
        ScanOutcome::NotFound => {
            bail!(
                "no {} section found in {} (use --append-if-missing to append at end)",
                args.section,
                file.display()
            );
        }
    };

    println!("File: {}", file.display());
    println!("Insertion offset: {offset} of {file_len} bytes");

    if args.dry_run {
        println!("{}", "[DRY RUN - nothing written]".cyan());
        println!(
            "Would insert {} bytes (plus separators) after the last {} block",
            block.len(),
            args.section
        );
        return Ok(());
    }

    let receipt = match &args.backup_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating backup directory {}", dir.display()))?;
            backup::backup_into(&file, dir)?
        }
        None => backup::backup(&file)?,
    };
    println!(
        "{} Backup created: {} ({} bytes, xxh3 {:016x})",
        "✓".green(),
        receipt.backup_path.display(),
        receipt.bytes,
        receipt.xxh3
    );

    let before_window = args
        .diff
        .then(|| read_window(&file, offset))
        .transpose()?;

    let report = Splice::new(&file, offset, block).apply()?;

    println!(
        "{} Inserted at offset {} ({} bytes streamed in {} chunks)",
        "✓".green(),
        report.offset,
        report.copy_stats.bytes,
        report.copy_stats.chunks
    );
    println!("Result: {} bytes", report.result_len);

    if let Some(before) = before_window {
        let after = read_window(&file, offset)?;
        display_diff(&file, &before, &after);
    }

    Ok(())
}

fn cmd_generate_stores(args: StoresArgs, mappings: &Mappings) -> Result<()> {
    let books = if args.books.is_empty() {
        mappings.commitment_books.keys().cloned().collect()
    } else {
        args.books.clone()
    };

    for book in &books {
        if !mappings.commitment_books.contains_key(book) {
            bail!("unknown commitment book: {book}");
        }
    }

    let mut destinations = String::from("* Defined Destinations\n\n");
    for queue in mappings.book_queues() {
        let params = template::PrinterDestination {
            store_name: &args.name,
            address: &args.address,
            city_state_zip: &args.city_state_zip,
            ..template::PrinterDestination::new(queue, &args.store)
        };
        destinations.push_str(&template::printer_destination(&params, mappings));
        destinations.push_str("\n\n");
    }
    for book in &books {
        destinations.push_str(&template::folder_destination(&args.report, book, &args.store));
        destinations.push_str("\n\n");
    }

    let mut rules = String::from("* Defined Rules\n\n");
    for book in &books {
        let config = &mappings.commitment_books[book];
        rules.push_str(&template::commitment_rule(&template::CommitmentRule::new(
            &args.report,
            book,
            &args.store,
            &config.variable,
            &config.queue,
        )));
        rules.push_str("\n\n");
    }

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    let destinations_file = args.out_dir.join(format!("destinations_{timestamp}.txt"));
    let rules_file = args.out_dir.join(format!("rules_{timestamp}.txt"));
    fs::write(&destinations_file, &destinations)?;
    fs::write(&rules_file, &rules)?;

    println!("{}", "Files generated:".bold());
    println!("  Destinations: {}", destinations_file.display());
    println!("  Rules:        {}", rules_file.display());

    if args.combined {
        let combined_file = args.out_dir.join(format!("pcx_import_{timestamp}.txt"));
        fs::write(&combined_file, format!("{destinations}\n\n{rules}"))?;
        println!("  Combined:     {}", combined_file.display());
    }

    println!(
        "{} Generated {} commitment books for store {}",
        "✓".green(),
        books.len(),
        args.store
    );
    Ok(())
}

fn cmd_generate_tax(args: TaxArgs, mappings: &Mappings) -> Result<()> {
    let reports = if args.reports.is_empty() {
        mappings.tax_report_jobs.keys().cloned().collect()
    } else {
        args.reports.clone()
    };

    let content = template::consolidated_tax_rules(&args.companies, &reports, mappings);
    if content.is_empty() {
        bail!(
            "no rules generated: none of the reports ({}) are configured",
            reports.join(", ")
        );
    }

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let out_file = args.out_dir.join(format!("tax_report_{timestamp}.txt"));

    let header = format!(
        "* PCX Export File - Tax Report Configuration\n* Generated: {}\n* Companies: {}\n\n",
        Local::now().to_rfc3339(),
        args.companies.join(", ")
    );
    fs::write(&out_file, format!("{header}{content}\n"))?;

    println!("{} Configuration written to {}", "✓".green(), out_file.display());
    println!("  Companies: {}", args.companies.join(", "));
    println!("  Reports:   {}", reports.len());
    Ok(())
}

fn cmd_stats(file: &Path) -> Result<()> {
    let blocks = schema::parse_blocks(file)?;
    let counts = schema::section_counts(&blocks);

    if counts.is_empty() {
        println!("{}", "No blocks found".yellow());
        return Ok(());
    }

    println!("{}", "Section statistics".bold());
    println!("{:<20} | {:>6}", "Section", "Blocks");
    println!("{}", "-".repeat(30));
    for (section, count) in &counts {
        println!("{section:<20} | {count:>6}");
    }
    println!("{}", "-".repeat(30));
    println!("{:<20} | {:>6}", "Total", blocks.len());
    Ok(())
}

/// Resolve the patch target: a file is used as-is, a directory resolves to
/// its most recently modified `.txt` export.
fn resolve_export_file(target: &Path) -> Result<PathBuf> {
    if target.is_file() {
        return Ok(target.to_path_buf());
    }
    if !target.is_dir() {
        bail!("target not found: {}", target.display());
    }

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in WalkDir::new(target).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file()
            || entry.path().extension().and_then(|s| s.to_str()) != Some("txt")
        {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, entry.path().to_path_buf()));
        }
    }

    match newest {
        Some((_, path)) => {
            println!("{}", format!("Using newest export: {}", path.display()).dimmed());
            Ok(path)
        }
        None => bail!("no .txt exports found in {}", target.display()),
    }
}

/// Bytes around the insertion offset, capped so diffing a 100 MB export
/// never reads more than a small window.
const DIFF_WINDOW: u64 = 2048;

fn read_window(file: &Path, offset: u64) -> Result<String> {
    let mut f = File::open(file)?;
    let start = offset.saturating_sub(DIFF_WINDOW);
    f.seek(SeekFrom::Start(start))?;
    let mut buf = vec![0u8; (DIFF_WINDOW * 4) as usize];
    let mut filled = 0;
    while filled < buf.len() {
        let n = f.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Unified diff of the insertion neighbourhood.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
