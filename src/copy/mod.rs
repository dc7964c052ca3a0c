//! Copy engine: moves novel files into the dated destination tree.
//!
//! # Overview
//!
//! [`CopyEngine::copy_from`] walks one source root in walker order
//! (depth-first, siblings sorted by name). For every regular file:
//!
//! 1. If the index already holds a byte-identical file, it is skipped.
//! 2. Otherwise the dated folder for its modification time is created
//!    (see [`DateDir::mkdir`]) and the file is copied there under its own
//!    name, or `name (n).ext` if that name is taken. Names are claimed
//!    with an exclusive create, so an existing file is never overwritten.
//! 3. The copy gets the source's permissions and access/modification
//!    times, and is pushed into the index.
//!
//! An error on one file is recorded in the [`CopySummary`] and the walk
//! goes on. A set shutdown flag stops the walk before the next file.
//!
//! The engine borrows the run's [`ContentIndex`] mutably, so files copied
//! from one root are already known when the next root is processed.

pub mod naming;

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use filetime::FileTime;
use serde::Serialize;

use crate::datedir::{DateDir, DateDirError};
use crate::index::{ContentIndex, IndexError};
use crate::progress::{Phase, Reporter};
use crate::scanner::{EntryKind, ScanError, Walker, WalkerConfig};
use naming::{candidate_path, MAX_NAME_ATTEMPTS};

/// Errors raised while copying.
#[derive(thiserror::Error, Debug)]
pub enum CopyError {
    /// The source root is not a directory.
    #[error("Source is not a directory: {0}")]
    SourceNotDirectory(PathBuf),

    /// The source could not be walked.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Looking up or registering the file in the index failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The dated folder could not be created.
    #[error(transparent)]
    DateDir(#[from] DateDirError),

    /// A filesystem operation failed.
    #[error("Failed to {action} {path}: {source}")]
    Io {
        /// What was being attempted
        action: &'static str,
        /// Path involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Every numbered candidate name was taken.
    #[error("No free name for {name} in {dir} after {attempts} attempts")]
    NoUniqueName {
        /// Destination folder
        dir: PathBuf,
        /// Original file name
        name: String,
        /// Candidates tried
        attempts: usize,
    },
}

impl CopyError {
    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A file that was copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    /// File that was read
    pub source_path: PathBuf,
    /// Dated folder the copy went into
    pub destination_directory: PathBuf,
    /// Final path of the copy
    pub destination_path: PathBuf,
    /// Source modification time, applied to the copy
    pub modification_time: FileTime,
    /// Source access time, applied to the copy
    pub access_time: FileTime,
    /// Bytes written
    pub bytes: u64,
}

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Its content already exists in the destination.
    Skipped,
    /// It was copied.
    Copied(CopyTask),
}

/// A file or directory that could not be handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    /// Path the failure refers to
    pub path: PathBuf,
    /// Error message
    pub message: String,
}

/// Totals for one or more source roots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopySummary {
    /// Files copied
    pub copied: usize,
    /// Files skipped as duplicates
    pub skipped: usize,
    /// Files or directories that failed
    pub failed: usize,
    /// Files left out by exclude patterns
    pub excluded_files: usize,
    /// Directories left out by exclude patterns
    pub excluded_dirs: usize,
    /// Bytes written to the destination
    pub bytes_copied: u64,
    /// Every failure, in walk order
    pub errors: Vec<FileFailure>,
    /// The walk stopped early on request
    pub interrupted: bool,
}

impl CopySummary {
    /// Add another summary's totals to this one.
    pub fn merge(&mut self, other: CopySummary) {
        self.copied += other.copied;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.excluded_files += other.excluded_files;
        self.excluded_dirs += other.excluded_dirs;
        self.bytes_copied += other.bytes_copied;
        self.errors.extend(other.errors);
        self.interrupted |= other.interrupted;
    }

    fn record_failure(&mut self, path: &Path, error: &dyn std::error::Error) {
        self.failed += 1;
        self.errors.push(FileFailure {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }
}

/// Copies novel files from source roots into the index root.
pub struct CopyEngine<'a> {
    index: &'a mut ContentIndex,
    datedir: &'a DateDir,
    walker_config: &'a WalkerConfig,
    reporter: &'a dyn Reporter,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl<'a> CopyEngine<'a> {
    /// Create an engine writing below `index.root()`.
    pub fn new(
        index: &'a mut ContentIndex,
        datedir: &'a DateDir,
        walker_config: &'a WalkerConfig,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            index,
            datedir,
            walker_config,
            reporter,
            shutdown_flag: None,
        }
    }

    /// Stop between files once `flag` is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Copy every novel file under `source_root`.
    ///
    /// # Errors
    ///
    /// Returns [`CopyError::SourceNotDirectory`] or [`CopyError::Scan`] if
    /// the root itself cannot be walked. Failures on individual files are
    /// reported in the summary instead.
    pub fn copy_from(&mut self, source_root: &Path) -> Result<CopySummary, CopyError> {
        match fs::metadata(source_root) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(CopyError::SourceNotDirectory(source_root.to_path_buf())),
            Err(e) => return Err(ScanError::from_io(source_root, e).into()),
        }

        let mut walker = Walker::new(source_root, self.walker_config.clone());
        if let Some(flag) = &self.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        let counts = walker.count(&[EntryKind::File, EntryKind::Dir]);
        log::info!("Copying files from {}", source_root.display());
        log::info!(
            "Found {} file(s) in {} directories",
            counts.files,
            counts.dirs
        );

        let mut summary = CopySummary::default();
        self.reporter.on_phase_start(Phase::Copy, counts.files);

        for entry in walker.entries() {
            let entry = match entry {
                Ok(entry) if entry.kind == EntryKind::File => entry,
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("{}", e);
                    self.reporter.on_error(e.path(), &e);
                    summary.record_failure(e.path(), &e);
                    continue;
                }
            };

            let path = entry.path.as_path();
            self.reporter.on_progress(path);
            match self.copy_file(path) {
                Ok(FileOutcome::Skipped) => {
                    summary.skipped += 1;
                    self.reporter.on_skip(path);
                }
                Ok(FileOutcome::Copied(task)) => {
                    summary.copied += 1;
                    summary.bytes_copied += task.bytes;
                    self.reporter
                        .on_file_copied(&task.source_path, &task.destination_path);
                }
                Err(e) => {
                    log::warn!("Failed to copy {}: {}", path.display(), e);
                    self.reporter.on_error(path, &e);
                    summary.record_failure(path, &e);
                }
            }
        }

        let (excluded_files, excluded_dirs) = walker.excluded();
        summary.excluded_files = excluded_files;
        summary.excluded_dirs = excluded_dirs;
        summary.interrupted = self.is_shutdown_requested();
        self.reporter.on_phase_end(Phase::Copy);

        log::info!(
            "Copied {} file(s), skipped {}, failed {} from {}",
            summary.copied,
            summary.skipped,
            summary.failed,
            source_root.display()
        );
        if excluded_files > 0 || excluded_dirs > 0 {
            log::info!(
                "Excluded {} file(s) and {} dir(s)",
                excluded_files,
                excluded_dirs
            );
        }

        Ok(summary)
    }

    /// Skip or copy a single file.
    ///
    /// # Errors
    ///
    /// Returns [`CopyError`] if the file cannot be hashed, its folder cannot
    /// be created, or the copy fails. A copy that could not be finished or
    /// indexed is removed.
    pub fn copy_file(&mut self, source: &Path) -> Result<FileOutcome, CopyError> {
        let hash = self.index.digest(source)?;
        if self.index.contains_hashed(&hash, source)? {
            log::debug!("Skipping {}: content already present", source.display());
            return Ok(FileOutcome::Skipped);
        }

        let metadata = fs::metadata(source).map_err(|e| CopyError::io("stat", source, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| CopyError::io("read modification time of", source, e))?;
        let task_times = (
            FileTime::from_last_modification_time(&metadata),
            FileTime::from_last_access_time(&metadata),
        );

        let directory = self.datedir.mkdir(self.index.root(), modified)?;
        let file_name = source.file_name().ok_or_else(|| {
            CopyError::io(
                "read name of",
                source,
                io::Error::new(ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;

        let (destination, bytes) = create_copy(source, &directory, file_name)?;

        let finish = fs::set_permissions(&destination, metadata.permissions())
            .map_err(|e| CopyError::io("set permissions on", &destination, e))
            .and_then(|()| {
                filetime::set_file_times(&destination, task_times.1, task_times.0)
                    .map_err(|e| CopyError::io("set times on", &destination, e))
            })
            .and_then(|()| {
                self.index
                    .push_hashed(&hash, &destination)
                    .map(|_| ())
                    .map_err(CopyError::from)
            });
        if let Err(e) = finish {
            let _ = fs::remove_file(&destination);
            return Err(e);
        }
        log::debug!(
            "Copied {} -> {}",
            source.display(),
            destination.display()
        );

        Ok(FileOutcome::Copied(CopyTask {
            source_path: source.to_path_buf(),
            destination_directory: directory,
            destination_path: destination,
            modification_time: task_times.0,
            access_time: task_times.1,
            bytes,
        }))
    }
}

/// Copy `source` into `dir` under the first free candidate name.
fn create_copy(
    source: &Path,
    dir: &Path,
    file_name: &std::ffi::OsStr,
) -> Result<(PathBuf, u64), CopyError> {
    let mut reader = File::open(source).map_err(|e| CopyError::io("open", source, e))?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = candidate_path(dir, file_name, attempt);
        let mut writer = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::trace!("Name taken: {}", candidate.display());
                continue;
            }
            Err(e) => return Err(CopyError::io("create", &candidate, e)),
        };

        let written = io::copy(&mut reader, &mut writer).and_then(|bytes| {
            writer.sync_all()?;
            Ok(bytes)
        });
        return match written {
            Ok(bytes) => Ok((candidate, bytes)),
            Err(e) => {
                drop(writer);
                let _ = fs::remove_file(&candidate);
                Err(CopyError::io("write", &candidate, e))
            }
        };
    }

    Err(CopyError::NoUniqueName {
        dir: dir.to_path_buf(),
        name: file_name.to_string_lossy().into_owned(),
        attempts: MAX_NAME_ATTEMPTS,
    })
}
