//! Latches termination signals so the sequence can stop between stages.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nix::sys::signal::Signal;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use thiserror::Error;
use tracing::debug;

use super::PROCESS_TARGET;

/// Signals that abort the sequence before handoff.
pub const TERMINATION_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Errors reported while installing signal handlers.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing a handler failed.
    #[error("failed to install handler for signal {signal}: {source}")]
    Install {
        /// Signal number.
        signal: i32,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shared flag recording the first termination signal received.
///
/// Cloning the flag shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct TerminationFlag {
    raised: Arc<AtomicUsize>,
}

impl TerminationFlag {
    /// Builds a flag that no signal handler writes to.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a flag and registers it for every [`TERMINATION_SIGNALS`] entry.
    pub fn install() -> Result<Self, SignalError> {
        let flag = Self::new();
        for signal in TERMINATION_SIGNALS {
            let value = signal_value(signal);
            signal_hook::flag::register_usize(signal, Arc::clone(&flag.raised), value)
                .map_err(|source| SignalError::Install { signal, source })?;
        }
        debug!(
            target: PROCESS_TARGET,
            signals = ?TERMINATION_SIGNALS,
            "termination handlers installed"
        );
        Ok(flag)
    }

    /// Records `signal` as if it had been delivered.
    pub fn raise(&self, signal: i32) {
        self.raised.store(signal_value(signal), Ordering::SeqCst);
    }

    /// Returns the signal received so far, if any.
    #[must_use]
    pub fn raised(&self) -> Option<i32> {
        match self.raised.load(Ordering::SeqCst) {
            0 => None,
            value => i32::try_from(value).ok(),
        }
    }
}

/// Renders a signal number as its conventional name.
#[must_use]
pub fn signal_name(signal: i32) -> String {
    Signal::try_from(signal)
        .map(|known| known.as_str().to_owned())
        .unwrap_or_else(|_| format!("signal {signal}"))
}

fn signal_value(signal: i32) -> usize {
    usize::try_from(signal.unsigned_abs()).unwrap_or(usize::MAX)
}
