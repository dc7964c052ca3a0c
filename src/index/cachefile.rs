//! On-disk format of the index cache.
//!
//! ```text
//! record := hash "#" path_count ";" path*
//! path   := byte_length ":" raw_bytes
//! ```
//!
//! Records are concatenated without separators. Lengths count bytes, so
//! paths may contain any of `#`, `;` or `:`. An empty input is an empty
//! index.

use std::collections::{BTreeMap, BTreeSet};

/// Hash → set of relative paths, as stored in the cache.
///
/// Paths are raw name bytes joined with `/`; they need not be UTF-8.
pub type Entries = BTreeMap<String, BTreeSet<Vec<u8>>>;

/// A malformed cache file.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed cache at byte {offset}: {reason}")]
pub struct CacheFormatError {
    /// Byte offset where parsing failed
    pub offset: usize,
    /// What was expected
    pub reason: String,
}

/// Serialize index entries.
#[must_use]
pub fn encode(entries: &Entries) -> Vec<u8> {
    let mut out = Vec::new();
    for (hash, paths) in entries {
        if paths.is_empty() {
            continue;
        }
        out.extend_from_slice(hash.as_bytes());
        out.push(b'#');
        out.extend_from_slice(paths.len().to_string().as_bytes());
        out.push(b';');
        for path in paths {
            out.extend_from_slice(path.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(path);
        }
    }
    out
}

/// Parse a cache file's bytes.
///
/// # Errors
///
/// Returns [`CacheFormatError`] on a missing delimiter, a non-numeric
/// count or length, a length past the end of input, an empty path, an
/// empty or non-hex hash, or a record with no paths.
pub fn decode(bytes: &[u8]) -> Result<Entries, CacheFormatError> {
    let mut cursor = Cursor { bytes, pos: 0 };
    let mut entries = Entries::new();

    while !cursor.at_end() {
        let hash_start = cursor.pos;
        let hash = cursor.take_until(b'#')?;
        if hash.is_empty() || !hash.iter().all(u8::is_ascii_hexdigit) {
            return Err(cursor.error_at(hash_start, "hash must be non-empty hex"));
        }
        let hash = String::from_utf8_lossy(hash).to_ascii_lowercase();

        let count = cursor.number(b';')?;
        if count == 0 {
            return Err(cursor.error_at(hash_start, "record has no paths"));
        }

        let set = entries.entry(hash).or_default();
        for _ in 0..count {
            let len = cursor.number(b':')?;
            let start = cursor.pos;
            let path = cursor.take(len)?;
            if path.is_empty() {
                return Err(cursor.error_at(start, "path is empty"));
            }
            set.insert(path.to_vec());
        }
    }

    Ok(entries)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn error_at(&self, offset: usize, reason: &str) -> CacheFormatError {
        CacheFormatError {
            offset,
            reason: reason.to_string(),
        }
    }

    /// Bytes up to (not including) `delim`; the delimiter is consumed.
    fn take_until(&mut self, delim: u8) -> Result<&'a [u8], CacheFormatError> {
        let bytes = self.bytes;
        let rest = &bytes[self.pos..];
        match rest.iter().position(|&b| b == delim) {
            Some(i) => {
                self.pos += i + 1;
                Ok(&rest[..i])
            }
            None => Err(self.error_at(
                self.pos,
                &format!("missing '{}' delimiter", char::from(delim)),
            )),
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CacheFormatError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| self.error_at(self.pos, "length runs past end of input"))?;
        let bytes = self.bytes;
        let slice = &bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn number(&mut self, delim: u8) -> Result<usize, CacheFormatError> {
        let start = self.pos;
        let digits = self.take_until(delim)?;
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(self.error_at(start, "expected a decimal number"));
        }
        String::from_utf8_lossy(digits)
            .parse()
            .map_err(|_| self.error_at(start, "number out of range"))
    }
}
