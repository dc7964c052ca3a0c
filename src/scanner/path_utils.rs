//! Unicode normalization and relative path helpers.
//!
//! # Background
//!
//! macOS uses NFD (Decomposed) normalization for file paths, while Windows
//! and Linux typically use NFC (Composed) normalization. The same visual
//! folder name can therefore have different byte representations:
//!
//! - NFC: `März` - 'ä' is U+00E4 (single code point)
//! - NFD: `März` - 'a' U+0061 + combining diaeresis U+0308
//!
//! Date folders are matched by their normalized names so that a folder
//! created on one platform is reused on another.
//!
//! Index paths are stored relative to the destination root as raw name
//! bytes with `/` separators regardless of host OS.
//!
//! # Example
//!
//! ```
//! use folderize::scanner::path_utils::{normalize_path_str, paths_equal};
//!
//! let nfc = "März";
//! let nfd = "Ma\u{0308}rz";
//!
//! assert_eq!(normalize_path_str(nfc), normalize_path_str(nfd));
//! assert!(paths_equal(nfc, nfd));
//! ```

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Normalize a string to NFC (Composed) form.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Check if two strings are equal after NFC normalization.
#[must_use]
pub fn paths_equal(a: &str, b: &str) -> bool {
    normalize_path_str(a) == normalize_path_str(b)
}

/// Comparison key for folder names: NFC normalized and lowercased.
#[must_use]
pub fn folder_key(name: &str) -> String {
    normalize_path_str(name).to_lowercase()
}

/// Express `path` relative to `root` as `/`-separated raw bytes.
///
/// Name bytes are kept as the OS returns them, so names that are not
/// valid UTF-8 survive. On platforms without byte-oriented names a
/// component must be valid Unicode.
///
/// Returns `None` if `path` is not below `root`.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use folderize::scanner::path_utils::relative_slash_path;
///
/// let rel = relative_slash_path(Path::new("/dst"), Path::new("/dst/2020/March/a.jpg"));
/// assert_eq!(rel.as_deref(), Some(&b"2020/March/a.jpg"[..]));
/// ```
#[must_use]
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<Vec<u8>> {
    let relative = path.strip_prefix(root).ok()?;
    let mut out = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                if !out.is_empty() {
                    out.push(b'/');
                }
                out.extend_from_slice(name_bytes(part)?);
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.is_empty() {
        return None;
    }
    Some(out)
}

/// Join a `/`-separated relative path onto `root`.
#[must_use]
pub fn join_slash_path(root: &Path, relative: &[u8]) -> PathBuf {
    relative
        .split(|&b| b == b'/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |path, part| path.join(name_from_bytes(part)))
}

/// Lossy text form of a stored relative path, for messages.
#[must_use]
pub fn display_slash_path(relative: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(relative)
}

#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Option<&[u8]> {
    use std::os::unix::ffi::OsStrExt;
    Some(name.as_bytes())
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Option<&[u8]> {
    name.to_str().map(str::as_bytes)
}

#[cfg(unix)]
fn name_from_bytes(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(bytes).to_os_string()
}

#[cfg(not(unix))]
fn name_from_bytes(bytes: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(bytes).into_owned())
}
