//! Capability degradation guard.
//!
//! The guard wraps the single backend initialization call. A failure whose
//! message carries a known "optional capability unavailable" signature is
//! forgiven, but only when the active configuration already supplies that
//! capability through a separate provider. Only the final line of the message
//! is classified, so a warning printed before a fatal error cannot excuse it.
//! Every other failure, including a recognised one with no fallback, is
//! returned unchanged.

use camino::Utf8Path;

use crate::synth::RuntimeConfig;

mod classify;
mod initializer;

pub use classify::{Classification, ErrorClassifier, SignatureClassifier};
pub use initializer::{
    BackendInitializer, CommandInitializer, InitError, NoopInitializer, RUNTIME_CONFIG_ENV,
};

/// Result of a guarded initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// Initialization succeeded outright.
    Clean,
    /// A recognised optional capability was unavailable; the fallback
    /// provider covers it.
    Degraded {
        /// Capability that could not be enabled.
        capability: String,
        /// Provider supplying the capability instead.
        fallback: String,
        /// Original error text.
        message: String,
    },
}

/// Interceptor around backend initialization.
#[derive(Debug, Clone)]
pub struct DegradationGuard<C> {
    classifier: C,
}

impl<C> DegradationGuard<C>
where
    C: ErrorClassifier,
{
    /// Builds a guard using `classifier`.
    #[must_use]
    pub const fn new(classifier: C) -> Self {
        Self { classifier }
    }

    /// Runs `initializer` exactly once and classifies any failure.
    pub fn initialize(
        &self,
        initializer: &dyn BackendInitializer,
        document: &Utf8Path,
        config: &RuntimeConfig,
    ) -> Result<InitOutcome, InitError> {
        let error = match initializer.initialize(document) {
            Ok(()) => return Ok(InitOutcome::Clean),
            Err(error) => error,
        };
        if error.interrupted_by().is_some() {
            return Err(error);
        }
        let Classification::OptionalCapabilityUnavailable { capability } =
            self.classifier.classify(initializer::final_line(error.message()))
        else {
            return Err(error);
        };
        match config.fallback_for(&capability) {
            Some(fallback) => Ok(InitOutcome::Degraded {
                capability,
                fallback,
                message: error.message().to_owned(),
            }),
            None => Err(error),
        }
    }
}
