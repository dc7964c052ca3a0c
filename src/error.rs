//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for folderize.
///
/// - 0: Success
/// - 1: General error (bad configuration, unreadable index, ...)
/// - 2: Verify found source files missing from the destination
/// - 3: Partial success (some files could not be copied)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Every file was handled.
    Success = 0,
    /// An unexpected error stopped the run.
    GeneralError = 1,
    /// Verify listed at least one missing file.
    MissingFiles = 2,
    /// The run finished but some files failed.
    PartialSuccess = 3,
    /// The run was interrupted by Ctrl+C.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "FZ000",
            Self::GeneralError => "FZ001",
            Self::MissingFiles => "FZ002",
            Self::PartialSuccess => "FZ003",
            Self::Interrupted => "FZ130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "FZ001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
