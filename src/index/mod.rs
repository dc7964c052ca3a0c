//! Content-addressed index of the destination directory.
//!
//! # Overview
//!
//! [`ContentIndex`] maps a file's content digest (lowercase hex BLAKE3) to
//! the set of paths, relative to the destination root, known to hold that
//! content. It answers one question for the copy engine: is this file's
//! content already somewhere under the root?
//!
//! A digest match alone never decides that. Every candidate path under the
//! digest is compared byte for byte against the file (see
//! [`files_equal`](crate::scanner::files_equal)), so two files that collide
//! on the digest are still told apart.
//!
//! # Lifecycle
//!
//! 1. Created empty with [`ContentIndex::new`]
//! 2. Populated by [`ContentIndex::generate`] or [`ContentIndex::load_cachefile`]
//! 3. Optionally reconciled with [`ContentIndex::update`]
//! 4. Mutated by [`ContentIndex::push`] and [`ContentIndex::remove`]
//! 5. Persisted by [`ContentIndex::save_cachefile`]
//!
//! Entries are correct at insertion time only. A file that changes or
//! disappears afterwards is noticed by the next `update()`, except for
//! content changed in place under the same name, which is not detected.
//!
//! # Example
//!
//! ```no_run
//! use folderize::index::ContentIndex;
//! use std::path::Path;
//!
//! let mut index = ContentIndex::new(Path::new("/backup/photos")).unwrap();
//! if index.load_cachefile().is_err() {
//!     index.generate().unwrap();
//! }
//! println!("{} file(s) indexed", index.len());
//! ```

pub mod cachefile;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub use cachefile::{CacheFormatError, Entries};

use crate::scanner::path_utils::{display_slash_path, join_slash_path, relative_slash_path};
use crate::scanner::{
    files_equal, EntryKind, HashError, Hasher, ScanError, Walker, WalkerConfig, CACHE_FILE_NAME,
    CACHE_TEMP_FILE_NAME,
};

/// Errors raised by [`ContentIndex`] operations.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// The cache file could not be read or written.
    #[error("Cache I/O error for {path}: {source}")]
    Io {
        /// Path of the cache (or temporary) file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cache file content is malformed.
    #[error(transparent)]
    Format(#[from] CacheFormatError),

    /// A removal referred to a pair the index does not hold.
    #[error("Index has no entry {path} under hash {hash}")]
    Consistency {
        /// Digest that was looked up
        hash: String,
        /// Relative path that was looked up
        path: String,
    },

    /// A file could not be hashed or compared.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// A path cannot be stored relative to the index root.
    #[error("{path} cannot be stored relative to {root}")]
    OutsideRoot {
        /// Offending path
        path: PathBuf,
        /// Index root
        root: PathBuf,
    },

    /// Walking the root met one or more errors.
    #[error("{} error(s) while indexing {root}", .errors.len())]
    Walk {
        /// Index root
        root: PathBuf,
        /// Every error met, in walk order
        errors: Vec<ScanError>,
    },
}

/// Result of [`ContentIndex::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Live files newly indexed under their own path (absolute)
    pub added: Vec<PathBuf>,
    /// Indexed paths that no longer exist (relative to the root)
    pub removed: Vec<PathBuf>,
}

impl Diff {
    /// Number of changes found.
    #[must_use]
    pub fn total(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// True when the index already matched the directory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Digest → relative paths index rooted at a destination directory.
#[derive(Debug, Clone)]
pub struct ContentIndex {
    root: PathBuf,
    entries: Entries,
    hasher: Hasher,
    walker_config: WalkerConfig,
}

impl ContentIndex {
    /// Create an empty index anchored at `root`.
    ///
    /// `root` is made absolute but not canonicalized, so it need not exist
    /// yet.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Io`] if the current directory is needed and
    /// unavailable.
    pub fn new(root: &Path) -> Result<Self, IndexError> {
        let root = std::path::absolute(root).map_err(|source| IndexError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        Ok(Self {
            root,
            entries: Entries::new(),
            hasher: Hasher::new(),
            walker_config: WalkerConfig::default(),
        })
    }

    /// Walk the root with this configuration instead of the default.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Use a specific hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// The absolute directory all stored paths are relative to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the cache file.
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.root.join(CACHE_FILE_NAME)
    }

    /// Number of indexed paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(|paths| paths.len()).sum()
    }

    /// Number of distinct digests.
    #[must_use]
    pub fn hash_count(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Relative paths stored under `hash`, in sorted order.
    pub fn paths_for(&self, hash: &str) -> impl Iterator<Item = &[u8]> + '_ {
        self.entries
            .get(hash)
            .into_iter()
            .flat_map(|paths| paths.iter().map(Vec::as_slice))
    }

    /// Digest of a file in the form used as index key.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Hash`] if the file cannot be read.
    pub fn digest(&self, path: &Path) -> Result<String, IndexError> {
        Ok(self.hasher.hex_digest(path)?)
    }

    /// Index every file under the root.
    ///
    /// See [`ContentIndex::generate_with`].
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Walk`] if any entry could not be read.
    pub fn generate(&mut self) -> Result<usize, IndexError> {
        self.generate_with(|_| {})
    }

    /// Index every file under the root, calling `callback` with each file
    /// path before it is hashed.
    ///
    /// Existing entries are kept; files whose content is already indexed
    /// are not added again. Walk and hash errors do not stop the pass: they
    /// are returned together afterwards as [`IndexError::Walk`], and every
    /// file indexed up to then stays indexed.
    ///
    /// Returns the number of paths inserted.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Walk`] if any entry could not be read or a
    /// file name cannot be stored.
    pub fn generate_with<F>(&mut self, mut callback: F) -> Result<usize, IndexError>
    where
        F: FnMut(&Path),
    {
        log::debug!("Generating index for {}", self.root.display());
        let walker = Walker::new(&self.root, self.walker_config.clone());
        let mut inserted = 0;
        let mut errors = Vec::new();

        for entry in walker.entries() {
            match entry {
                Ok(entry) if entry.kind == EntryKind::File => {
                    callback(&entry.path);
                    match self.push(&entry.path) {
                        Ok(true) => inserted += 1,
                        Ok(false) => {}
                        Err(e) => errors.push(Self::file_error(e, &entry.path)),
                    }
                }
                Ok(_) => {}
                Err(e) => errors.push(e),
            }
        }

        log::debug!(
            "Indexed {} path(s) under {} digest(s)",
            self.len(),
            self.hash_count()
        );

        if errors.is_empty() {
            Ok(inserted)
        } else {
            Err(IndexError::Walk {
                root: self.root.clone(),
                errors,
            })
        }
    }

    /// Reconcile the index with the live directory.
    ///
    /// Indexed paths that no longer name a file are removed. Files present
    /// under the root but not indexed under their own path are pushed; one
    /// whose content is already indexed elsewhere stays out of the index
    /// and out of [`Diff::added`]. A file whose content changed in place is
    /// not detected.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Walk`] without touching the index if the root
    /// cannot be listed. Files that cannot be hashed or named are skipped
    /// and reported afterwards as [`IndexError::Walk`].
    pub fn update(&mut self) -> Result<Diff, IndexError> {
        let walker = Walker::new(&self.root, self.walker_config.clone());
        let (files, errors) = walker.collect(&[EntryKind::File]);
        if !errors.is_empty() {
            return Err(IndexError::Walk {
                root: self.root.clone(),
                errors,
            });
        }

        let mut file_errors = Vec::new();
        let mut live = Vec::with_capacity(files.len());
        for path in files {
            match self.relative(&path) {
                Ok(relative) => live.push((relative, path)),
                Err(e) => file_errors.push(Self::file_error(e, &path)),
            }
        }
        live.sort();

        let mut diff = Diff::default();
        let mut accounted = vec![false; live.len()];
        let mut stale = Vec::new();

        for (hash, paths) in &self.entries {
            for relative in paths {
                match live.binary_search_by(|(r, _)| r.cmp(relative)) {
                    Ok(i) => accounted[i] = true,
                    Err(_) => stale.push((hash.clone(), relative.clone())),
                }
            }
        }

        for (hash, relative) in stale {
            log::debug!(
                "Removing vanished file from index: {}",
                display_slash_path(&relative)
            );
            self.remove(&hash, &relative)?;
            diff.removed.push(join_slash_path(Path::new(""), &relative));
        }

        for ((_, path), seen) in live.into_iter().zip(accounted) {
            if seen {
                continue;
            }
            match self.push(&path) {
                Ok(true) => {
                    log::debug!("Indexed new file: {}", path.display());
                    diff.added.push(path);
                }
                Ok(false) => {
                    log::debug!("Content already indexed, not adding {}", path.display());
                }
                Err(e) => {
                    log::warn!("Cannot index {}: {}", path.display(), e);
                    file_errors.push(Self::file_error(e, &path));
                }
            }
        }

        if file_errors.is_empty() {
            Ok(diff)
        } else {
            Err(IndexError::Walk {
                root: self.root.clone(),
                errors: file_errors,
            })
        }
    }

    /// Add a file to the index unless its content is already present.
    ///
    /// Returns `true` if a path was inserted.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Hash`] if the file cannot be read, or
    /// [`IndexError::OutsideRoot`] if it does not live under the root.
    pub fn push(&mut self, path: &Path) -> Result<bool, IndexError> {
        let hash = self.digest(path)?;
        self.push_hashed(&hash, path)
    }

    /// [`ContentIndex::push`] with a digest computed by the caller.
    ///
    /// # Errors
    ///
    /// See [`ContentIndex::push`].
    pub fn push_hashed(&mut self, hash: &str, path: &Path) -> Result<bool, IndexError> {
        if self.contains_hashed(hash, path)? {
            return Ok(false);
        }
        let relative = self.relative(path)?;
        self.entries
            .entry(hash.to_string())
            .or_default()
            .insert(relative);
        Ok(true)
    }

    /// Remove exactly one `(hash, relative_path)` pair.
    ///
    /// A digest left without paths is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Consistency`] if the pair is not indexed.
    pub fn remove(&mut self, hash: &str, relative_path: &[u8]) -> Result<(), IndexError> {
        let consistency = || IndexError::Consistency {
            hash: hash.to_string(),
            path: display_slash_path(relative_path).into_owned(),
        };

        let paths = self.entries.get_mut(hash).ok_or_else(consistency)?;
        if !paths.remove(relative_path) {
            return Err(consistency());
        }
        if paths.is_empty() {
            self.entries.remove(hash);
        }
        Ok(())
    }

    /// Whether a byte-identical copy of `path` is indexed.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Hash`] if `path` itself cannot be read.
    pub fn contains(&self, path: &Path) -> Result<bool, IndexError> {
        if self.entries.is_empty() {
            return Ok(false);
        }
        let hash = self.digest(path)?;
        self.contains_hashed(&hash, path)
    }

    /// [`ContentIndex::contains`] with a digest computed by the caller.
    ///
    /// Candidates that can no longer be read count as non-matches.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Hash`] if `path` itself cannot be read.
    pub fn contains_hashed(&self, hash: &str, path: &Path) -> Result<bool, IndexError> {
        let Some(candidates) = self.entries.get(hash) else {
            return Ok(false);
        };

        for relative in candidates {
            let candidate = join_slash_path(&self.root, relative);
            if candidate == path {
                return Ok(true);
            }
            match files_equal(&candidate, path) {
                Ok(true) => return Ok(true),
                Ok(false) => {
                    log::debug!(
                        "Digest match but content differs: {} vs {}",
                        candidate.display(),
                        path.display()
                    );
                }
                Err(e) if e.path() == candidate.as_path() => {
                    log::debug!("Indexed file unreadable, ignoring: {}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(false)
    }

    /// Replace the index with the content of the cache file.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Io`] if the file is missing or unreadable and
    /// [`IndexError::Format`] if it is malformed. The index is unchanged
    /// on error.
    pub fn load_cachefile(&mut self) -> Result<(), IndexError> {
        let path = self.cache_path();
        let bytes = fs::read(&path).map_err(|source| IndexError::Io {
            path: path.clone(),
            source,
        })?;
        self.entries = cachefile::decode(&bytes)?;
        log::debug!(
            "Loaded {} path(s) from {}",
            self.len(),
            path.display()
        );
        Ok(())
    }

    /// Write the index to the cache file.
    ///
    /// The data goes to a temporary sibling first and is renamed over the
    /// cache, so an interrupted save leaves the previous cache intact.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Io`] if writing or renaming fails.
    pub fn save_cachefile(&self) -> Result<(), IndexError> {
        let path = self.cache_path();
        let temp_path = self.root.join(CACHE_TEMP_FILE_NAME);
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| IndexError::Io { path, source }
        };

        let file = File::create(&temp_path).map_err(io_err(&temp_path))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&cachefile::encode(&self.entries))
            .map_err(io_err(&temp_path))?;
        let file = writer
            .into_inner()
            .map_err(|e| IndexError::Io {
                path: temp_path.clone(),
                source: e.into_error(),
            })?;
        file.sync_all().map_err(io_err(&temp_path))?;
        drop(file);

        fs::rename(&temp_path, &path).map_err(io_err(&path))?;
        log::debug!("Saved {} path(s) to {}", self.len(), path.display());
        Ok(())
    }

    /// Iterate over all `(hash, relative_path)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.entries.iter().flat_map(|(hash, paths)| {
            paths
                .iter()
                .map(move |path| (hash.as_str(), path.as_slice()))
        })
    }

    fn relative(&self, path: &Path) -> Result<Vec<u8>, IndexError> {
        relative_slash_path(&self.root, path).ok_or_else(|| IndexError::OutsideRoot {
            path: path.to_path_buf(),
            root: self.root.clone(),
        })
    }

    /// Per-file error met while walking the root.
    fn file_error(error: IndexError, path: &Path) -> ScanError {
        match error {
            IndexError::Hash(e) => ScanError::Hash(e),
            IndexError::OutsideRoot { path, .. } => ScanError::UnsupportedName(path),
            other => ScanError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other(other),
            },
        }
    }
}
