//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//! This module provides the [`Hasher`] struct for computing BLAKE3 hashes
//! of file contents using memory-efficient streaming, and [`files_equal`]
//! for the byte-for-byte check that backs every duplicate decision.
//!
//! The digest is a deduplication key, not proof of identity: callers
//! confirm a hash match with [`files_equal`] before treating two files as
//! the same content.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use super::HashError;

/// Raw BLAKE3 digest.
pub type Hash = [u8; 32];

/// Read buffer size for hashing and comparison.
const BUFFER_SIZE: usize = 64 * 1024;

/// Streaming BLAKE3 hasher for whole files.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: BUFFER_SIZE,
        }
    }

    /// Use a custom read buffer size (at least one byte).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read, for
    /// example when it disappeared between the walk and the read.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..n]);
        }

        Ok(*hasher.finalize().as_bytes())
    }

    /// Hash a file and return the digest as lowercase hex.
    ///
    /// # Errors
    ///
    /// See [`Hasher::full_hash`].
    pub fn hex_digest(&self, path: &Path) -> Result<String, HashError> {
        self.full_hash(path).map(|hash| hash_to_hex(&hash))
    }
}

/// Encode a digest as lowercase hex.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}

/// Compare two files byte for byte.
///
/// Files of different length are rejected without reading their content.
///
/// # Errors
///
/// Returns [`HashError`] carrying the path of whichever file could not be
/// read.
pub fn files_equal(a: &Path, b: &Path) -> Result<bool, HashError> {
    let file_a = File::open(a).map_err(|e| HashError::from_io(a, e))?;
    let file_b = File::open(b).map_err(|e| HashError::from_io(b, e))?;

    let len_a = file_a
        .metadata()
        .map_err(|e| HashError::from_io(a, e))?
        .len();
    let len_b = file_b
        .metadata()
        .map_err(|e| HashError::from_io(b, e))?
        .len();
    if len_a != len_b {
        return Ok(false);
    }

    let mut reader_a = BufReader::with_capacity(BUFFER_SIZE, file_a);
    let mut reader_b = BufReader::with_capacity(BUFFER_SIZE, file_b);
    let mut buf_a = vec![0u8; BUFFER_SIZE];
    let mut buf_b = vec![0u8; BUFFER_SIZE];

    loop {
        let n_a = fill(&mut reader_a, &mut buf_a).map_err(|e| HashError::from_io(a, e))?;
        let n_b = fill(&mut reader_b, &mut buf_b).map_err(|e| HashError::from_io(b, e))?;

        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
