//! Date-based destination folders.
//!
//! A directory-structure template such as `%Y/%B/%e` is parsed once into
//! segments of literal text and [`Directive`]s, then expanded against a
//! file's modification time:
//!
//! | Directive | Meaning            | Example (en-US) |
//! |-----------|--------------------|-----------------|
//! | `%Y`      | year, full         | `2020`          |
//! | `%y`      | year, 2 digits     | `20`            |
//! | `%m`      | month, 2 digits    | `03`            |
//! | `%b`      | month, short name  | `Mar`           |
//! | `%B`      | month, long name   | `March`         |
//! | `%e`      | day, no padding    | `5`             |
//! | `%d`      | day, 2 digits      | `05`            |
//!
//! Unknown directives are kept as literal text and `%%` is a literal `%`.
//! Month names come from chrono's locale tables.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use folderize::datedir::DateDir;
//!
//! let datedir = DateDir::new("%Y/%B/%e", "en-US").unwrap();
//! let date = Utc.with_ymd_and_hms(2020, 3, 15, 12, 0, 0).unwrap();
//! assert_eq!(datedir.format_date(&date), "2020/March/15");
//! ```

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, Locale, TimeZone};

use crate::scanner::path_utils::folder_key;

/// Errors from template parsing and folder creation.
#[derive(thiserror::Error, Debug)]
pub enum DateDirError {
    /// The locale name is not known to chrono.
    #[error("Unknown locale: {0}")]
    InvalidLocale(String),

    /// The template contains an empty, `.` or `..` segment.
    #[error("Invalid directory template '{template}': segment '{segment}' is not a folder name")]
    InvalidSegment {
        /// The full template
        template: String,
        /// The offending segment
        segment: String,
    },

    /// A formatted segment expanded to something unusable as a folder name.
    #[error("Template segment expanded to invalid folder name '{0}'")]
    InvalidFolderName(String),

    /// A folder could not be listed or created.
    #[error("Failed to {action} {path}: {source}")]
    Io {
        /// What was being attempted
        action: &'static str,
        /// Folder involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// A date directive in a template segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// `%Y`
    YearFull,
    /// `%y`
    YearShort,
    /// `%m`
    MonthNumeric,
    /// `%b`
    MonthShortName,
    /// `%B`
    MonthLongName,
    /// `%e`
    DayNumeric,
    /// `%d`
    DayPadded,
}

impl Directive {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'Y' => Some(Self::YearFull),
            'y' => Some(Self::YearShort),
            'm' => Some(Self::MonthNumeric),
            'b' => Some(Self::MonthShortName),
            'B' => Some(Self::MonthLongName),
            'e' => Some(Self::DayNumeric),
            'd' => Some(Self::DayPadded),
            _ => None,
        }
    }

    fn render<Tz: TimeZone>(self, date: &DateTime<Tz>, locale: Locale) -> String
    where
        Tz::Offset: fmt::Display,
    {
        match self {
            Self::YearFull => date.year().to_string(),
            Self::YearShort => format!("{:02}", date.year().rem_euclid(100)),
            Self::MonthNumeric => format!("{:02}", date.month()),
            Self::MonthShortName => date.format_localized("%b", locale).to_string(),
            Self::MonthLongName => date.format_localized("%B", locale).to_string(),
            Self::DayNumeric => date.day().to_string(),
            Self::DayPadded => format!("{:02}", date.day()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Directive(Directive),
}

/// A parsed directory-structure template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTemplate {
    source: String,
    segments: Vec<Vec<Token>>,
}

impl DirTemplate {
    /// The template text this was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of folder levels the template creates.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    fn parse_segment(segment: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = segment.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.peek().copied() {
                Some('%') => {
                    chars.next();
                    literal.push('%');
                }
                Some(next) => match Directive::from_char(next) {
                    Some(directive) => {
                        chars.next();
                        if !literal.is_empty() {
                            tokens.push(Token::Literal(std::mem::take(&mut literal)));
                        }
                        tokens.push(Token::Directive(directive));
                    }
                    None => literal.push('%'),
                },
                None => literal.push('%'),
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }
        tokens
    }
}

impl FromStr for DirTemplate {
    type Err = DateDirError;

    fn from_str(template: &str) -> Result<Self, Self::Err> {
        let trimmed = template.trim_matches('/');
        let mut segments = Vec::new();

        if !trimmed.is_empty() {
            for segment in trimmed.split('/') {
                if segment.is_empty() || segment == "." || segment == ".." {
                    return Err(DateDirError::InvalidSegment {
                        template: template.to_string(),
                        segment: segment.to_string(),
                    });
                }
                segments.push(Self::parse_segment(segment));
            }
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }
}

/// Parse a locale name such as `en-US` or `de_DE`.
///
/// # Errors
///
/// Returns [`DateDirError::InvalidLocale`] for names chrono does not know.
pub fn parse_locale(name: &str) -> Result<Locale, DateDirError> {
    let normalized = name.trim().replace('-', "_");
    Locale::try_from(normalized.as_str()).map_err(|_| DateDirError::InvalidLocale(name.to_string()))
}

/// Expands a [`DirTemplate`] for a given locale and creates the folders.
#[derive(Debug, Clone)]
pub struct DateDir {
    template: DirTemplate,
    locale: Locale,
    locale_name: String,
}

impl DateDir {
    /// Parse `template` and resolve `locale`.
    ///
    /// # Errors
    ///
    /// Returns [`DateDirError`] for invalid segments or an unknown locale.
    pub fn new(template: &str, locale: &str) -> Result<Self, DateDirError> {
        Ok(Self {
            template: template.parse()?,
            locale: parse_locale(locale)?,
            locale_name: locale.to_string(),
        })
    }

    /// The parsed template.
    #[must_use]
    pub fn template(&self) -> &DirTemplate {
        &self.template
    }

    /// The locale name as given.
    #[must_use]
    pub fn locale_name(&self) -> &str {
        &self.locale_name
    }

    /// Expand the template against a timestamp in the local time zone.
    #[must_use]
    pub fn format(&self, timestamp: SystemTime) -> String {
        let date: DateTime<Local> = timestamp.into();
        self.format_date(&date)
    }

    /// Expand the template against a date; segments are joined with `/`.
    #[must_use]
    pub fn format_date<Tz: TimeZone>(&self, date: &DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        self.template
            .segments
            .iter()
            .map(|segment| {
                segment
                    .iter()
                    .map(|token| match token {
                        Token::Literal(text) => text.clone(),
                        Token::Directive(directive) => directive.render(date, self.locale),
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Create (or reuse) the folder for `timestamp` below `root`.
    ///
    /// Each level reuses an existing folder whose normalized name equals
    /// the segment, or failing that one that starts with the segment
    /// followed by a non-alphanumeric character (`March` reuses
    /// `March 2020`, day `1` never reuses `15`). Otherwise the folder is
    /// created. An empty template returns `root` itself.
    ///
    /// # Errors
    ///
    /// Returns [`DateDirError::Io`] if a folder cannot be listed or created.
    pub fn mkdir(&self, root: &Path, timestamp: SystemTime) -> Result<PathBuf, DateDirError> {
        let formatted = self.format(timestamp);
        let mut dir = root.to_path_buf();
        if self.template.depth() == 0 {
            return Ok(dir);
        }

        for segment in formatted.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(DateDirError::InvalidFolderName(segment.to_string()));
            }
            dir = match find_folder(&dir, segment)? {
                Some(existing) => existing,
                None => create_folder(dir.join(segment))?,
            };
        }

        Ok(dir)
    }
}

/// Look for an existing child folder matching `segment`.
fn find_folder(parent: &Path, segment: &str) -> Result<Option<PathBuf>, DateDirError> {
    let entries = match fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(DateDirError::Io {
                action: "list",
                path: parent.to_path_buf(),
                source,
            })
        }
    };

    let mut folders: Vec<(String, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
        .collect();
    folders.sort();

    let wanted = folder_key(segment);
    if let Some((_, path)) = folders.iter().find(|(name, _)| folder_key(name) == wanted) {
        return Ok(Some(path.clone()));
    }

    let prefixed = folders.into_iter().find(|(name, _)| {
        let key = folder_key(name);
        key.strip_prefix(&wanted)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|next| !next.is_alphanumeric())
    });
    Ok(prefixed.map(|(_, path)| path))
}

fn create_folder(path: PathBuf) -> Result<PathBuf, DateDirError> {
    match fs::create_dir(&path) {
        Ok(()) => {
            log::debug!("Created folder {}", path.display());
            Ok(path)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(path),
        Err(source) => Err(DateDirError::Io {
            action: "create",
            path,
            source,
        }),
    }
}
