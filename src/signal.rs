//! Ctrl+C handling for graceful shutdown.
//!
//! An interrupt sets a shared `AtomicBool`. The copy loop checks it between
//! files, so the file being copied is finished, the index built so far is
//! still saved, and the process exits with [`EXIT_CODE_INTERRUPTED`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use folderize::signal::install_handler;
//!
//! let handler = install_handler();
//! let flag = handler.get_flag();
//! // Pass `flag` to CopyEngine::with_shutdown_flag
//! if handler.is_shutdown_requested() {
//!     // save the index and exit with 130
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption: 128 + SIGINT.
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared shutdown flag.
///
/// Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once Ctrl+C was pressed or [`ShutdownHandler::request_shutdown`]
    /// was called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a shutdown without a signal.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The flag itself, for the walker and copy engine.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C handler, once.
///
/// Later calls (several runs in one test process) get the same handler with
/// its flag cleared. If the hook cannot be registered, for example because
/// another component owns SIGINT, an unhooked handler is returned; it still
/// honors [`ShutdownHandler::request_shutdown`].
pub fn install_handler() -> ShutdownHandler {
    let handler = GLOBAL_HANDLER.get_or_init(|| {
        let handler = ShutdownHandler::new();
        let flag = handler.get_flag();

        let installed = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
            let _ = writeln!(
                std::io::stderr(),
                "\nInterrupted. Finishing current file and saving index..."
            );
            let _ = std::io::stderr().flush();
            log::info!("Shutdown signal received");
        });
        if let Err(e) = installed {
            log::warn!("Ctrl+C handler not installed: {}", e);
        }
        handler
    });

    handler.reset();
    handler.clone()
}
