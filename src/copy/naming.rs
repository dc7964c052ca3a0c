//! Unique destination names.
//!
//! When `photo.jpg` is taken, the next candidates are `photo (1).jpg`,
//! `photo (2).jpg` and so on. The number goes before the last extension
//! only; names without an extension (or dotfiles like `.bashrc`) get the
//! suffix at the end.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Upper bound on numbered candidates tried for one file.
pub const MAX_NAME_ATTEMPTS: usize = 10_000;

/// File name for attempt `n`; attempt 0 is the name unchanged.
///
/// # Example
///
/// ```
/// use std::ffi::OsStr;
/// use folderize::copy::naming::numbered_name;
///
/// assert_eq!(numbered_name(OsStr::new("a.tar.gz"), 2), "a.tar (2).gz");
/// assert_eq!(numbered_name(OsStr::new(".bashrc"), 1), ".bashrc (1)");
/// ```
#[must_use]
pub fn numbered_name(file_name: &OsStr, n: usize) -> OsString {
    if n == 0 {
        return file_name.to_os_string();
    }

    let path = Path::new(file_name);
    let stem = path.file_stem().unwrap_or(file_name);
    let mut name = stem.to_os_string();
    name.push(format!(" ({})", n));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Destination candidate for attempt `n` inside `dir`.
#[must_use]
pub fn candidate_path(dir: &Path, file_name: &OsStr, n: usize) -> PathBuf {
    dir.join(numbered_name(file_name, n))
}
