//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for depth-first, pre-order
//! traversal of a directory tree. Directories are reported before their
//! contents and siblings are visited in file-name order, so two walks over
//! an unchanged tree produce the same sequence.
//!
//! # Features
//!
//! - Exclusion via [`Matcher`]; excluded directories are not descended
//! - The reserved cache file is skipped in every walk
//! - Symlinks are reported but not followed unless configured
//! - Unreadable directories yield a [`ScanError`] and their subtree is skipped
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use folderize::scanner::{EntryKind, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Pictures"), WalkerConfig::default());
//! let counts = walker.count(&[EntryKind::File, EntryKind::Dir]);
//! println!("{} file(s) in {} directories", counts.files, counts.dirs);
//! ```

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use super::matcher::Matcher;
use super::{is_reserved_name, EntryKind, ScanError, WalkEntry, WalkerConfig};

/// Per-kind totals returned by [`Walker::count`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryCounts {
    /// Regular files
    pub files: usize,
    /// Directories (the walk root excluded)
    pub dirs: usize,
    /// Symbolic links that were not followed
    pub symlinks: usize,
    /// Errors met during the walk
    pub errors: usize,
}

/// Depth-first directory walker.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Files skipped by the matcher during the last walk
    excluded_files: Cell<usize>,
    /// Directories skipped by the matcher during the last walk
    excluded_dirs: Cell<usize>,
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to walk
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
            excluded_files: Cell::new(0),
            excluded_dirs: Cell::new(0),
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, iteration stops at the next entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The directory this walker starts from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of files and directories the matcher excluded during the
    /// most recent walk, as `(files, dirs)`.
    #[must_use]
    pub fn excluded(&self) -> (usize, usize) {
        (self.excluded_files.get(), self.excluded_dirs.get())
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Decide whether a walkdir entry (and its subtree) is kept.
    fn keep_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        let name = entry.file_name().to_string_lossy();
        if is_reserved_name(&name) {
            return false;
        }

        if entry.file_type().is_dir() {
            if self.config.matcher.is_excluded_dir(&name) {
                log::trace!("Excluding directory: {}", entry.path().display());
                self.excluded_dirs.set(self.excluded_dirs.get() + 1);
                return false;
            }
        } else if self.config.matcher.is_excluded(&name) {
            log::trace!("Excluding file: {}", entry.path().display());
            self.excluded_files.set(self.excluded_files.get() + 1);
            return false;
        }

        true
    }

    /// Check that the root exists and is a directory.
    fn check_root(&self) -> Option<ScanError> {
        match std::fs::metadata(&self.root) {
            Ok(metadata) if metadata.is_dir() => None,
            Ok(_) => Some(ScanError::NotADirectory(self.root.clone())),
            Err(e) => Some(ScanError::from_io(&self.root, e)),
        }
    }

    /// Walk the directory tree, yielding entries lazily.
    ///
    /// The root itself is not yielded. Errors are yielded as [`ScanError`]
    /// values rather than stopping iteration; the subtree of an unreadable
    /// directory is skipped. Each call starts a fresh walk.
    pub fn entries(&self) -> impl Iterator<Item = Result<WalkEntry, ScanError>> + '_ {
        self.excluded_files.set(0);
        self.excluded_dirs.set(0);

        let root_error = self.check_root();
        let walk = if root_error.is_none() {
            Some(
                WalkDir::new(&self.root)
                    .follow_links(self.config.follow_symlinks)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(move |entry| self.keep_entry(entry)),
            )
        } else {
            None
        };

        root_error.map(Err).into_iter().chain(
            walk.into_iter()
                .flatten()
                .take_while(move |_| {
                    if self.is_shutdown_requested() {
                        log::debug!("Walker: Shutdown requested, stopping iteration");
                        return false;
                    }
                    true
                })
                .filter_map(move |result| match result {
                    Ok(entry) => self.classify(entry).map(Ok),
                    Err(e) => Some(Err(self.handle_walkdir_error(e))),
                }),
        )
    }

    /// Turn a walkdir entry into a [`WalkEntry`], dropping the root and
    /// special files.
    fn classify(&self, entry: DirEntry) -> Option<WalkEntry> {
        if entry.depth() == 0 {
            return None;
        }

        let file_type = entry.file_type();
        let kind = if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_symlink() {
            log::trace!("Not following symlink: {}", entry.path().display());
            EntryKind::Symlink
        } else {
            log::debug!("Skipping special file: {}", entry.path().display());
            return None;
        };

        let depth = entry.depth();
        Some(WalkEntry {
            path: entry.into_path(),
            kind,
            depth,
        })
    }

    /// Convert a walkdir error, logging it on the way.
    fn handle_walkdir_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if error.loop_ancestor().is_some() {
            log::warn!("Symlink loop at {}", path.display());
            return ScanError::SymlinkLoop(path);
        }

        let message = error.to_string();
        log::warn!("Walker error for {}: {}", path.display(), message);
        match error.into_io_error() {
            Some(io) => ScanError::from_io(&path, io),
            None => ScanError::Io {
                path,
                source: std::io::Error::other(message),
            },
        }
    }

    /// Walk the tree, calling `on_file` for every regular file and `on_dir`
    /// for every directory (before its contents).
    ///
    /// Returns the errors met during the walk.
    pub fn visit<F, D>(&self, mut on_file: F, mut on_dir: D) -> Vec<ScanError>
    where
        F: FnMut(&Path),
        D: FnMut(&Path),
    {
        let mut errors = Vec::new();
        for entry in self.entries() {
            match entry {
                Ok(entry) => match entry.kind {
                    EntryKind::File => on_file(&entry.path),
                    EntryKind::Dir => on_dir(&entry.path),
                    EntryKind::Symlink => {}
                },
                Err(e) => errors.push(e),
            }
        }
        errors
    }

    /// Count entries of the requested kinds.
    ///
    /// Kinds that are not requested are reported as zero.
    #[must_use]
    pub fn count(&self, kinds: &[EntryKind]) -> EntryCounts {
        let mut counts = EntryCounts::default();
        for entry in self.entries() {
            match entry {
                Ok(entry) if kinds.contains(&entry.kind) => match entry.kind {
                    EntryKind::File => counts.files += 1,
                    EntryKind::Dir => counts.dirs += 1,
                    EntryKind::Symlink => counts.symlinks += 1,
                },
                Ok(_) => {}
                Err(_) => counts.errors += 1,
            }
        }
        counts
    }

    /// Collect the paths of entries of the requested kinds, in walk order,
    /// together with the errors met.
    #[must_use]
    pub fn collect(&self, kinds: &[EntryKind]) -> (Vec<PathBuf>, Vec<ScanError>) {
        let mut paths = Vec::new();
        let mut errors = Vec::new();
        for entry in self.entries() {
            match entry {
                Ok(entry) if kinds.contains(&entry.kind) => paths.push(entry.path),
                Ok(_) => {}
                Err(e) => errors.push(e),
            }
        }
        (paths, errors)
    }
}
