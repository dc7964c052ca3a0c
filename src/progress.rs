//! Progress reporting utilities using indicatif.
//!
//! The core engines never print. They report events through the
//! [`Reporter`] trait; [`Progress`] renders them as terminal progress bars
//! and [`NullReporter`] discards them.

use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Stage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Hashing the destination to build the index
    Index,
    /// Copying one source root
    Copy,
    /// Checking sources against the index
    Verify,
}

impl Phase {
    /// Short lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Copy => "copy",
            Self::Verify => "verify",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives progress events from the index, copy and verify engines.
///
/// Every file handled in a phase produces one `on_progress` call, followed
/// by at most one of `on_skip`, `on_file_copied` or `on_error`.
pub trait Reporter {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - The phase starting
    /// * `total` - Number of files the phase expects to handle
    fn on_phase_start(&self, phase: Phase, total: usize);

    /// Called for each file as it is handled.
    fn on_progress(&self, path: &Path);

    /// Called when a file is skipped because its content is already present.
    fn on_skip(&self, _path: &Path) {}

    /// Called after a file was copied.
    fn on_file_copied(&self, _source: &Path, _destination: &Path) {}

    /// Called when a file could not be handled.
    fn on_error(&self, _path: &Path, _error: &dyn std::error::Error) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: Phase);
}

/// A [`Reporter`] that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn on_phase_start(&self, _phase: Phase, _total: usize) {}
    fn on_progress(&self, _path: &Path) {}
    fn on_phase_end(&self, _phase: Phase) {}
}

#[derive(Debug, Default)]
struct Tally {
    copied: usize,
    skipped: usize,
    failed: usize,
}

impl Tally {
    fn message(&self, phase: Phase) -> String {
        match phase {
            Phase::Index => format!("{} failed", self.failed),
            Phase::Copy => format!(
                "{} copied, {} skipped, {} failed",
                self.copied, self.skipped, self.failed
            ),
            Phase::Verify => format!("{} found, {} failed", self.skipped, self.failed),
        }
    }
}

/// Progress reporter using indicatif.
///
/// One bar is shown per phase. Nothing is drawn in quiet mode.
pub struct Progress {
    bar: Mutex<Option<(Phase, ProgressBar)>>,
    tally: Mutex<Tally>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use folderize::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            tally: Mutex::new(Tally::default()),
            quiet,
        }
    }

    fn style(phase: Phase) -> ProgressStyle {
        let template = match phase {
            Phase::Index => {
                "{prefix:>6} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}"
            }
            Phase::Copy => {
                "{prefix:>6} [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})"
            }
            Phase::Verify => {
                "{prefix:>6} [{elapsed_precise}] [{bar:40.yellow/blue}] {pos}/{len} ({percent}%) {msg}"
            }
        };
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
    }

    fn with_bar(&self, f: impl FnOnce(Phase, &ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some((phase, bar)) = guard.as_ref() {
                f(*phase, bar);
            }
        }
    }

    fn bump(&self, update: impl FnOnce(&mut Tally)) {
        let Ok(mut tally) = self.tally.lock() else {
            return;
        };
        update(&mut tally);
        self.with_bar(|phase, bar| bar.set_message(tally.message(phase)));
    }
}

impl Reporter for Progress {
    fn on_phase_start(&self, phase: Phase, total: usize) {
        if self.quiet {
            return;
        }

        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        bar.set_style(Self::style(phase));
        bar.set_prefix(phase.as_str());

        if let Ok(mut tally) = self.tally.lock() {
            *tally = Tally::default();
            bar.set_message(tally.message(phase));
        }
        if let Ok(mut slot) = self.bar.lock() {
            if let Some((_, previous)) = slot.take() {
                previous.finish_and_clear();
            }
            *slot = Some((phase, bar));
        }
    }

    fn on_progress(&self, path: &Path) {
        if self.quiet {
            return;
        }
        log::trace!("Handling {}", truncate_path(path, 60));
        self.with_bar(|_, bar| bar.inc(1));
    }

    fn on_skip(&self, _path: &Path) {
        if !self.quiet {
            self.bump(|t| t.skipped += 1);
        }
    }

    fn on_file_copied(&self, _source: &Path, _destination: &Path) {
        if !self.quiet {
            self.bump(|t| t.copied += 1);
        }
    }

    fn on_error(&self, _path: &Path, _error: &dyn std::error::Error) {
        if !self.quiet {
            self.bump(|t| t.failed += 1);
        }
    }

    fn on_phase_end(&self, phase: Phase) {
        if self.quiet {
            return;
        }
        if let Ok(mut slot) = self.bar.lock() {
            if let Some((current, bar)) = slot.take() {
                if current == phase {
                    bar.finish();
                } else {
                    bar.finish_and_clear();
                }
            }
        }
    }
}

/// Truncate a path for display, keeping the file name.
#[must_use]
pub fn truncate_path(path: &Path, max_len: usize) -> String {
    let full = path.display().to_string();
    if full.chars().count() <= max_len {
        return full;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let keep = max_len.saturating_sub(3);
        let tail: String = file_name.chars().skip(name_len.saturating_sub(keep)).collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
