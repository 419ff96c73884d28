//! Cooperative cancellation of child processes.
//!
//! An interrupt from the terminal reaches the whole foreground process
//! group, so children see it directly. The orchestrator only records it
//! and stops waiting politely once the grace period runs out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

/// Shared flag set when the operator interrupts the tool.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is never triggered by signals.
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Create a token triggered by Ctrl-C.
    ///
    /// Can only be installed once per process.
    pub fn install_ctrlc() -> Result<Self> {
        let token = CancelToken::new();
        let handle = token.clone();
        ctrlc::set_handler(move || {
            if !handle.cancelled.swap(true, Ordering::SeqCst) {
                tracing::warn!("Interrupted; waiting for child process to exit");
            }
        })
        .context("failed to install interrupt handler")?;
        Ok(token)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
