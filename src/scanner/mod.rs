//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Deterministic depth-first directory walking using walkdir
//! - Content hashing with BLAKE3 and byte-for-byte comparison
//! - Exclude patterns (regex and gitignore-style globs)
//! - Unicode path normalization
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal, counting and collection
//! - [`hasher`]: BLAKE3 file hashing (streaming) and file comparison
//! - [`matcher`]: Exclusion rules applied to entry names
//! - [`path_utils`]: NFC normalization and `/`-separated relative paths
//!
//! # Example
//!
//! ```no_run
//! use folderize::scanner::{EntryKind, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for entry in walker.entries() {
//!     match entry {
//!         Ok(entry) if entry.kind == EntryKind::File => println!("{}", entry.path.display()),
//!         Ok(_) => {}
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod matcher;
pub mod path_utils;
pub mod walker;

use std::path::{Path, PathBuf};

// Re-export main types
pub use hasher::{files_equal, hash_to_hex, Hash, Hasher};
pub use matcher::{ExcludeMatcher, Matcher, MatcherError};
pub use walker::{EntryCounts, Walker};

/// Name of the index cache file kept in the destination root.
///
/// Never treated as a regular file: every walk skips it.
pub const CACHE_FILE_NAME: &str = ".folderize.cache";

/// Temporary sibling written while the cache file is being saved.
pub const CACHE_TEMP_FILE_NAME: &str = ".folderize.cache.tmp";

/// Returns true for names reserved by folderize itself.
#[must_use]
pub fn is_reserved_name(name: &str) -> bool {
    name == CACHE_FILE_NAME || name == CACHE_TEMP_FILE_NAME
}

/// Classification of a walked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory (reported before its contents)
    Dir,
    /// Symbolic link that was not followed
    Symlink,
}

/// A single entry produced by [`Walker::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Full path of the entry (the walk root joined with its relative path)
    pub path: PathBuf,
    /// What kind of entry this is
    pub kind: EntryKind,
    /// Depth below the walk root (direct children have depth 1)
    pub depth: usize,
}

/// Configuration for directory walking.
///
/// Controls exclusion rules and symlink handling.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Symlink cycles are reported as [`ScanError::SymlinkLoop`].
    pub follow_symlinks: bool,

    /// Exclusion rules applied to every entry name.
    pub matcher: ExcludeMatcher,
}

impl WalkerConfig {
    /// Create a new configuration.
    ///
    /// # Arguments
    ///
    /// * `follow_symlinks` - Whether to follow symbolic links
    /// * `matcher` - Exclusion rules for file and directory names
    #[must_use]
    pub fn new(follow_symlinks: bool, matcher: ExcludeMatcher) -> Self {
        Self {
            follow_symlinks,
            matcher,
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Following symbolic links led back to an ancestor directory.
    #[error("Symlink loop detected: {0}")]
    SymlinkLoop(PathBuf),

    /// A file could not be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// A file name the index cannot store on this platform.
    #[error("Unsupported file name: {0}")]
    UnsupportedName(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Map an I/O error on `path` to the matching variant.
    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// The path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(path)
            | Self::NotFound(path)
            | Self::NotADirectory(path)
            | Self::SymlinkLoop(path)
            | Self::UnsupportedName(path) => path,
            Self::Hash(e) => e.path(),
            Self::Io { path, .. } => path,
        }
    }
}

/// Errors that can occur during file hashing or comparison.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Map an I/O error on `path` to the matching variant.
    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// The file that could not be read.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) | Self::PermissionDenied(path) => path,
            Self::Io { path, .. } => path,
        }
    }
}
