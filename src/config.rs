//! Application configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. `config.toml` in the platform config directory, or the file given
//!    with `--config`
//! 3. `FOLDERIZE_*` environment variables (e.g. `FOLDERIZE_LOCALE=de-DE`)
//! 4. Command-line flags
//!
//! [`Config::resolve`] validates the merged result and produces the
//! [`Settings`] the run works from.
//!
//! # Example `config.toml`
//!
//! ```toml
//! output = "/home/me/Pictures"
//! dirstruct = "%Y/%m-%B"
//! locale = "de-DE"
//! exclude = ["^\\.", "\\.tmp$"]
//! ignore = ["Thumbs.db"]
//! cache = true
//! ```

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{Cli, DEFAULT_DIRSTRUCT, DEFAULT_LOCALE};
use crate::datedir::{DateDir, DateDirError};
use crate::scanner::{ExcludeMatcher, MatcherError, WalkerConfig};

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "FOLDERIZE_";

/// Configuration problems found before any file is touched.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A configuration source could not be parsed.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    MissingFile(PathBuf),

    /// The directory template or locale is invalid.
    #[error(transparent)]
    DateDir(#[from] DateDirError),

    /// An exclude or ignore pattern does not compile.
    #[error(transparent)]
    Pattern(#[from] MatcherError),

    /// No input directory was given.
    #[error("At least one input directory is required")]
    NoInput,

    /// An input is missing or not a directory.
    #[error("Input is not a directory: {0}")]
    InputNotDirectory(PathBuf),

    /// The output exists but is not a directory.
    #[error("Output is not a directory: {0}")]
    OutputNotDirectory(PathBuf),
}

/// Persistent defaults for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination directory
    pub output: PathBuf,
    /// Directory structure template
    pub dirstruct: String,
    /// Locale for month names
    pub locale: String,
    /// Exclude regexes
    pub exclude: Vec<String>,
    /// Exclude globs
    pub ignore: Vec<String>,
    /// Keep the index cache between runs
    pub cache: bool,
    /// Follow symbolic links
    pub follow_symlinks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from("."),
            dirstruct: DEFAULT_DIRSTRUCT.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            exclude: Vec::new(),
            ignore: Vec::new(),
            cache: false,
            follow_symlinks: false,
        }
    }
}

impl Config {
    /// Platform-specific location of `config.toml`, if one can be determined.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "folderize").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load defaults, the configuration file and the environment.
    ///
    /// `custom` replaces the platform default file and must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `custom` is missing or a source is
    /// malformed.
    pub fn load(custom: Option<&Path>) -> Result<Self, ConfigError> {
        match custom {
            Some(path) if !path.is_file() => Err(ConfigError::MissingFile(path.to_path_buf())),
            Some(path) => Self::load_from_path(path),
            None => match Self::default_path() {
                Some(path) => Self::load_from_path(&path),
                None => Self::figment(None).extract().map_err(|e| Box::new(e).into()),
            },
        }
    }

    /// Load defaults, the given file (if present) and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file or an environment variable
    /// is malformed.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading configuration from {}", path.display());
        Self::figment(Some(path))
            .extract()
            .map_err(|e| Box::new(e).into())
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Apply command-line overrides.
    ///
    /// Pattern lists given on the command line replace the configured ones.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(output) = &cli.output {
            self.output.clone_from(output);
        }
        if let Some(dirstruct) = &cli.dirstruct {
            self.dirstruct.clone_from(dirstruct);
        }
        if let Some(locale) = &cli.locale {
            self.locale.clone_from(locale);
        }
        if !cli.exclude.is_empty() {
            self.exclude.clone_from(&cli.exclude);
        }
        if !cli.ignore.is_empty() {
            self.ignore.clone_from(&cli.ignore);
        }
        if cli.cache {
            self.cache = true;
        }
        if cli.no_cache {
            self.cache = false;
        }
        if cli.follow_symlinks {
            self.follow_symlinks = true;
        }
    }

    /// Merge `cli` over this configuration and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a bad template, locale or pattern, a
    /// missing input, or an output that is not a directory.
    pub fn resolve(mut self, cli: &Cli) -> Result<Settings, ConfigError> {
        self.merge_cli(cli);

        if cli.input.is_empty() {
            return Err(ConfigError::NoInput);
        }
        if let Some(bad) = cli.input.iter().find(|path| !path.is_dir()) {
            return Err(ConfigError::InputNotDirectory(bad.clone()));
        }
        if self.output.exists() && !self.output.is_dir() {
            return Err(ConfigError::OutputNotDirectory(self.output));
        }

        let datedir = DateDir::new(&self.dirstruct, &self.locale)?;
        let matcher = ExcludeMatcher::from_patterns(&self.exclude, &self.ignore)?;

        Ok(Settings {
            input: cli.input.clone(),
            output: self.output,
            datedir,
            matcher,
            cache: self.cache,
            verify: cli.verify,
            follow_symlinks: self.follow_symlinks,
        })
    }
}

/// Validated, immutable settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Source directories, in the order given
    pub input: Vec<PathBuf>,
    /// Destination directory
    pub output: PathBuf,
    /// Parsed template and locale
    pub datedir: DateDir,
    /// Compiled exclude rules
    pub matcher: ExcludeMatcher,
    /// Load and save the index cache
    pub cache: bool,
    /// Audit instead of copying
    pub verify: bool,
    /// Follow symbolic links
    pub follow_symlinks: bool,
}

impl Settings {
    /// Walker configuration for source roots.
    #[must_use]
    pub fn source_walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(self.follow_symlinks, self.matcher.clone())
    }

    /// Walker configuration for the destination: no exclusions.
    #[must_use]
    pub fn destination_walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(self.follow_symlinks, ExcludeMatcher::new())
    }
}
