//! Read-only audit of source roots against the destination index.
//!
//! [`verify`] walks every source root with the same exclusion rules as a
//! copy and lists the files whose content is not present in the index.
//! Nothing is copied and the index is not modified.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::copy::FileFailure;
use crate::index::ContentIndex;
use crate::progress::{Phase, Reporter};
use crate::scanner::{EntryKind, Walker, WalkerConfig};

/// Outcome of [`verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Source files examined
    pub checked: usize,
    /// Source files whose content is absent from the destination
    pub missing: Vec<PathBuf>,
    /// Entries that could not be read
    pub errors: Vec<FileFailure>,
}

impl VerifyReport {
    /// True when every examined file is present and nothing failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.errors.is_empty()
    }
}

/// Check that the content of every file under `roots` exists in `index`.
///
/// Roots are processed in order; within a root, files are visited in
/// walker order. Unreadable roots, directories and files are reported in
/// [`VerifyReport::errors`] and do not stop the audit.
pub fn verify(
    roots: &[PathBuf],
    index: &ContentIndex,
    config: &WalkerConfig,
    reporter: &dyn Reporter,
) -> VerifyReport {
    let mut report = VerifyReport::default();

    for root in roots {
        verify_root(root, index, config, reporter, &mut report);
    }

    if report.missing.is_empty() {
        log::info!("All files from the input(s) exist in the output");
    } else {
        log::info!(
            "Missing {} file(s) in the output folder",
            report.missing.len()
        );
    }
    report
}

fn verify_root(
    root: &Path,
    index: &ContentIndex,
    config: &WalkerConfig,
    reporter: &dyn Reporter,
    report: &mut VerifyReport,
) {
    let walker = Walker::new(root, config.clone());
    let total = walker.count(&[EntryKind::File]).files;
    log::info!("Verifying {} file(s) from {}", total, root.display());
    reporter.on_phase_start(Phase::Verify, total);

    for entry in walker.entries() {
        let entry = match entry {
            Ok(entry) if entry.kind == EntryKind::File => entry,
            Ok(_) => continue,
            Err(e) => {
                log::warn!("{}", e);
                reporter.on_error(e.path(), &e);
                report.errors.push(FileFailure {
                    path: e.path().to_path_buf(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        reporter.on_progress(&entry.path);
        report.checked += 1;
        match index.contains(&entry.path) {
            Ok(true) => reporter.on_skip(&entry.path),
            Ok(false) => {
                log::debug!("Missing from destination: {}", entry.path.display());
                report.missing.push(entry.path);
            }
            Err(e) => {
                log::warn!("Cannot verify {}: {}", entry.path.display(), e);
                reporter.on_error(&entry.path, &e);
                report.errors.push(FileFailure {
                    path: entry.path,
                    message: e.to_string(),
                });
            }
        }
    }

    reporter.on_phase_end(Phase::Verify);
}
