//! Ctrl+C handling for scan cancellation.
//!
//! A [`CancelToken`] wraps the `Arc<AtomicBool>` the scan pipeline polls.
//! [`install_handler`] hooks Ctrl+C to it: the walk stops, buckets not yet
//! started are skipped, and the scan returns what it found so far. The CLI
//! then exits with [`EXIT_CODE_INTERRUPTED`].
//!
//! ```rust,no_run
//! use dupmerge::duplicates::FinderConfig;
//! use dupmerge::signal::install_handler;
//!
//! let token = install_handler().expect("signal handler");
//! let config = FinderConfig::default().with_shutdown_flag(token.flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption: 128 + 2.
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear a previous request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The flag to hand to [`FinderConfig`](crate::duplicates::FinderConfig)
    /// or a [`Walker`](crate::scanner::Walker).
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Hook Ctrl+C to a process-wide token and return it.
///
/// The handler is registered once per process; later calls reset and return
/// the same token, so repeated `run_app` calls (as in tests) work.
///
/// # Errors
///
/// Returns [`SignalError`] if the handler cannot be registered.
pub fn install_handler() -> Result<CancelToken, SignalError> {
    if let Some(token) = GLOBAL_TOKEN.get() {
        token.reset();
        return Ok(token.clone());
    }

    let token = CancelToken::new();
    let flag = token.flag();
    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing in-flight work...");
        let _ = std::io::stderr().flush();
        log::info!("Cancellation requested by signal");
    }) {
        Ok(()) => Ok(GLOBAL_TOKEN.get_or_init(|| token).clone()),
        Err(ctrlc::Error::MultipleHandlers) => {
            log::debug!("Ctrl+C handler already registered elsewhere, using unhooked token");
            Ok(GLOBAL_TOKEN.get_or_init(CancelToken::new).clone())
        }
        Err(e) => Err(e.into()),
    }
}
