//! folderize - copy files into a date-based folder tree without duplicates
//!
//! Files from one or more source directories are copied into a destination
//! directory below folders derived from their modification time (by
//! default `YYYY/Month/Day`). A file is skipped when a byte-identical file
//! already exists anywhere in the destination, which is decided with a
//! content-addressed index ([`index::ContentIndex`]) that can be cached in
//! the destination between runs.
//!
//! # Architecture
//!
//! - [`scanner`]: directory walking, hashing, exclusion rules
//! - [`datedir`]: directory-structure templates and folder creation
//! - [`index`]: the content index and its cache file
//! - [`copy`]: the copy engine
//! - [`verify`]: read-only audit of sources against the destination
//! - [`config`], [`cli`], [`logging`], [`progress`], [`signal`], [`error`]:
//!   application plumbing

pub mod cli;
pub mod config;
pub mod copy;
pub mod datedir;
pub mod error;
pub mod index;
pub mod logging;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod verify;

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytesize::ByteSize;
use serde::Serialize;
use yansi::Paint;

use crate::cli::Cli;
use crate::config::{Config, Settings};
use crate::copy::{CopyEngine, CopySummary};
use crate::error::ExitCode;
use crate::index::{ContentIndex, IndexError};
use crate::progress::{Phase, Progress, Reporter};
use crate::scanner::{EntryKind, Walker};
use crate::verify::VerifyReport;

/// How the destination index was obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexSource {
    /// Built by hashing the destination
    #[default]
    Generated,
    /// Restored from the cache file and reconciled
    Cache,
}

/// Everything a run did, printed at the end (as JSON with `--json`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Destination directory
    pub output: PathBuf,
    /// Where the index came from
    pub index_source: IndexSource,
    /// Paths in the index after the run
    pub indexed_files: usize,
    /// Files added to a cached index by reconciliation
    pub reconciled_added: usize,
    /// Paths dropped from a cached index by reconciliation
    pub reconciled_removed: usize,
    /// Copy totals over all inputs
    #[serde(flatten)]
    pub copy: CopySummary,
    /// Audit result, in verify mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<VerifyReport>,
}

impl RunSummary {
    /// Exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.copy.interrupted {
            return ExitCode::Interrupted;
        }
        if let Some(report) = &self.verify {
            if !report.missing.is_empty() {
                return ExitCode::MissingFiles;
            }
            if !report.errors.is_empty() {
                return ExitCode::PartialSuccess;
            }
        }
        if self.copy.errors.is_empty() {
            ExitCode::Success
        } else {
            ExitCode::PartialSuccess
        }
    }
}

/// Run folderize from parsed command-line arguments.
///
/// Sets up logging, configuration, progress and Ctrl+C handling, performs
/// the run and prints its summary.
///
/// # Errors
///
/// Returns an error for invalid configuration or when the destination
/// index cannot be built, loaded or saved.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color || cli.json {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref())?;
    let settings = config.resolve(&cli).context("Invalid configuration")?;

    let shutdown = signal::install_handler();
    let progress = Progress::new(cli.quiet || cli.json);
    let summary = run(&settings, &progress, Some(shutdown.get_flag()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !cli.quiet {
        print_summary(&summary);
    }

    Ok(summary.exit_code())
}

/// Perform a run (copy or verify) with already validated settings.
///
/// # Errors
///
/// Returns an error if the destination cannot be created or indexed, a
/// source root cannot be walked, or the cache cannot be saved. When caching
/// is on, the index is saved before a copy error is returned.
pub fn run(
    settings: &Settings,
    reporter: &dyn Reporter,
    shutdown: Option<Arc<AtomicBool>>,
) -> Result<RunSummary> {
    let mut summary = RunSummary {
        output: settings.output.clone(),
        ..RunSummary::default()
    };

    if settings.verify {
        let index = open_index(settings, reporter, &mut summary)?;
        let report = verify::verify(
            &settings.input,
            &index,
            &settings.source_walker_config(),
            reporter,
        );
        summary.indexed_files = index.len();
        summary.verify = Some(report);
        return Ok(summary);
    }

    fs::create_dir_all(&settings.output).with_context(|| {
        format!(
            "Failed to create output directory {}",
            settings.output.display()
        )
    })?;
    let mut index = open_index(settings, reporter, &mut summary)?;

    let walker_config = settings.source_walker_config();
    let mut engine = CopyEngine::new(&mut index, &settings.datedir, &walker_config, reporter);
    if let Some(flag) = shutdown {
        engine = engine.with_shutdown_flag(flag);
    }

    let mut copy_result: Result<()> = Ok(());
    for root in &settings.input {
        match engine.copy_from(root) {
            Ok(root_summary) => summary.copy.merge(root_summary),
            Err(e) => {
                copy_result =
                    Err(e).with_context(|| format!("Failed to copy from {}", root.display()));
                break;
            }
        }
        if summary.copy.interrupted {
            log::warn!("Interrupted, stopping before the next file");
            break;
        }
    }
    drop(engine);

    if settings.cache {
        index.save_cachefile().context("Failed to save index cache")?;
        log::info!("Saved file lookup to {}", index.cache_path().display());
    }
    copy_result?;

    summary.indexed_files = index.len();
    Ok(summary)
}

/// Load the cached index (and reconcile it) or build one from scratch.
fn open_index(
    settings: &Settings,
    reporter: &dyn Reporter,
    summary: &mut RunSummary,
) -> Result<ContentIndex> {
    let mut index = ContentIndex::new(&settings.output)?
        .with_walker_config(settings.destination_walker_config());

    if settings.cache {
        match index.load_cachefile() {
            Ok(()) => {
                log::info!("Restored file lookup from cache ({} files)", index.len());
                let diff = index
                    .update()
                    .map_err(log_walk_errors)
                    .context("Failed to reconcile cached index")?;
                if !diff.is_empty() {
                    log::info!(
                        "Reconciled cache: {} added, {} removed",
                        diff.added.len(),
                        diff.removed.len()
                    );
                }
                summary.index_source = IndexSource::Cache;
                summary.reconciled_added = diff.added.len();
                summary.reconciled_removed = diff.removed.len();
                return Ok(index);
            }
            Err(IndexError::Format(e)) => {
                log::warn!("Ignoring malformed cache ({}), regenerating", e);
            }
            Err(IndexError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                log::debug!("No cache file yet");
            }
            Err(e) => return Err(e).context("Failed to load index cache"),
        }
    }

    if !settings.output.exists() {
        log::info!(
            "Output {} does not exist, nothing to index",
            settings.output.display()
        );
        return Ok(index);
    }

    let walker = Walker::new(index.root(), settings.destination_walker_config());
    let counts = walker.count(&[EntryKind::File, EntryKind::Dir]);
    log::info!("Creating file lookup for {}", index.root().display());
    log::info!(
        "Found {} file(s) in {} directories",
        counts.files,
        counts.dirs
    );

    reporter.on_phase_start(Phase::Index, counts.files);
    let generated = index.generate_with(|path| reporter.on_progress(path));
    reporter.on_phase_end(Phase::Index);
    generated
        .map_err(log_walk_errors)
        .context("Failed to index output directory")?;

    summary.index_source = IndexSource::Generated;
    Ok(index)
}

fn log_walk_errors(error: IndexError) -> IndexError {
    if let IndexError::Walk { errors, .. } = &error {
        for e in errors {
            log::error!("{}", e);
        }
    }
    error
}

fn print_summary(summary: &RunSummary) {
    if let Some(report) = &summary.verify {
        if report.missing.is_empty() {
            println!(
                "{} All {} file(s) from the input(s) exist in the output.",
                "○".green(),
                report.checked
            );
        } else {
            println!(
                "{} Missing the following {} file(s) in the output folder:",
                "×".red().bold(),
                report.missing.len()
            );
            for path in &report.missing {
                println!("  • {}", path.display());
            }
        }
        for failure in &report.errors {
            println!("  {} {}: {}", "!".yellow(), failure.path.display(), failure.message);
        }
        return;
    }

    let copy = &summary.copy;
    println!(
        "{} Copied {} file(s) ({}), skipped {}, failed {}",
        "✔".green().bold(),
        copy.copied,
        ByteSize::b(copy.bytes_copied),
        copy.skipped,
        copy.failed
    );
    if copy.excluded_files > 0 || copy.excluded_dirs > 0 {
        println!(
            "  Excluded {} file(s) and {} dir(s)",
            copy.excluded_files, copy.excluded_dirs
        );
    }
    for failure in &copy.errors {
        println!(
            "  {} {}: {}",
            "!".yellow(),
            failure.path.display(),
            failure.message
        );
    }
    if copy.interrupted {
        println!("{} Interrupted; progress so far was kept.", "⚠".yellow().bold());
    }
}
