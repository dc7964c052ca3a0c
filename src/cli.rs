//! Command-line interface definitions for folderize.
//!
//! Options left unset here fall back to the configuration file and
//! `FOLDERIZE_*` environment variables (see [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Sort two camera dumps into ~/Pictures by year, month and day
//! folderize -i /media/sd1 -i /media/sd2 -o ~/Pictures
//!
//! # German month names, cache the index between runs
//! folderize -i ./import -o ./archive -l de-DE --cache
//!
//! # Check that everything under ./import is already in ./archive
//! folderize -i ./import -o ./archive --verify
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Default directory-structure template.
pub const DEFAULT_DIRSTRUCT: &str = "%Y/%B/%e";

/// Default locale for month names.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Copy files into a date-based folder tree, skipping content that is
/// already there.
///
/// Every file under the input directories is copied into OUTPUT/<dirstruct>,
/// where the folders are derived from the file's modification time. Files
/// whose exact content already exists anywhere in OUTPUT are skipped.
#[derive(Debug, Parser)]
#[command(name = "folderize")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print the run summary (or error) as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Source directories to copy from (can be specified multiple times)
    #[arg(short, long = "input", value_name = "DIR", required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Destination directory [default: .]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Directory structure template (%Y %y %m %b %B %e %d) [default: %Y/%B/%e]
    #[arg(short, long, value_name = "TEMPLATE")]
    pub dirstruct: Option<String>,

    /// Locale for month names, e.g. en-US or de-DE [default: en-US]
    #[arg(short, long, value_name = "LOCALE")]
    pub locale: Option<String>,

    /// Regex matched against file and directory names to exclude
    /// (can be specified multiple times)
    #[arg(short, long = "exclude", value_name = "REGEX")]
    pub exclude: Vec<String>,

    /// Gitignore-style glob of names to exclude (can be specified multiple
    /// times)
    #[arg(short = 'g', long = "ignore", value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Keep the destination index in OUTPUT/.folderize.cache between runs
    #[arg(short, long, conflicts_with = "no_cache")]
    pub cache: bool,

    /// Do not use the index cache, even if enabled in the configuration
    #[arg(long)]
    pub no_cache: bool,

    /// Only report input files whose content is missing from OUTPUT
    #[arg(long)]
    pub verify: bool,

    /// Follow symbolic links in inputs and output
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Configuration file to use instead of the platform default
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
