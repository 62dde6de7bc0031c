//! Test double for [`BootReporter`] that records boot events for assertions.

use std::sync::Mutex;

use crate::bootstrap::{BootError, BootStage};
use crate::guard::InitError;
use crate::health::BootReporter;
use crate::probe::{DependencyTarget, ProbeFailure};
use crate::process::ExecPlan;
use crate::synth::{RuntimeConfig, SynthesizedDocument};

/// Boot events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootEvent {
    BootStarting(String),
    StageEntered(BootStage),
    RuntimeResolved,
    ProbeSkipped(String),
    ProbeFailed { target: String, attempt: u32 },
    ProbeReady { target: String, attempts: u32 },
    ProbeExhausted { target: String, attempts: u32 },
    DocumentWritten { digest: String },
    InitializationSucceeded,
    InitializationDegraded { capability: String, fallback: String, message: String },
    InitializationFailed(String),
    HandingOff(String),
    BootAborted { message: String, exit_code: u8 },
}

impl BootEvent {
    /// Whether the event is logged at warning level in production.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::ProbeExhausted { .. } | Self::InitializationDegraded { .. }
        )
    }

    /// Whether the event stands for a readiness attempt.
    #[must_use]
    pub fn is_probe_attempt(&self) -> bool {
        matches!(self, Self::ProbeFailed { .. } | Self::ProbeReady { .. })
    }
}

/// Records boot events for assertions.
#[derive(Debug, Default)]
pub struct RecordingBootReporter {
    events: Mutex<Vec<BootEvent>>,
}

impl RecordingBootReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<BootEvent> {
        self.events
            .lock()
            .expect("boot reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: BootEvent) {
        self.events
            .lock()
            .expect("boot reporter mutex poisoned")
            .push(event);
    }
}

impl BootReporter for RecordingBootReporter {
    fn boot_starting(&self, profile_origin: &str) {
        self.record(BootEvent::BootStarting(profile_origin.to_owned()));
    }

    fn stage_entered(&self, stage: BootStage) {
        self.record(BootEvent::StageEntered(stage));
    }

    fn runtime_resolved(&self, _config: &RuntimeConfig) {
        self.record(BootEvent::RuntimeResolved);
    }

    fn probe_skipped(&self, target: &DependencyTarget) {
        self.record(BootEvent::ProbeSkipped(target.name().to_owned()));
    }

    fn probe_failed(&self, target: &DependencyTarget, attempt: u32, _failure: &ProbeFailure) {
        self.record(BootEvent::ProbeFailed {
            target: target.name().to_owned(),
            attempt,
        });
    }

    fn probe_ready(&self, target: &DependencyTarget, attempts: u32) {
        self.record(BootEvent::ProbeReady {
            target: target.name().to_owned(),
            attempts,
        });
    }

    fn probe_exhausted(&self, target: &DependencyTarget, attempts: u32, _last_error: &str) {
        self.record(BootEvent::ProbeExhausted {
            target: target.name().to_owned(),
            attempts,
        });
    }

    fn document_written(&self, document: &SynthesizedDocument) {
        self.record(BootEvent::DocumentWritten {
            digest: document.digest.clone(),
        });
    }

    fn initialization_succeeded(&self) {
        self.record(BootEvent::InitializationSucceeded);
    }

    fn initialization_degraded(&self, capability: &str, fallback: &str, message: &str) {
        self.record(BootEvent::InitializationDegraded {
            capability: capability.to_owned(),
            fallback: fallback.to_owned(),
            message: message.to_owned(),
        });
    }

    fn initialization_failed(&self, error: &InitError) {
        self.record(BootEvent::InitializationFailed(error.message().to_owned()));
    }

    fn handing_off(&self, plan: &ExecPlan, _dry_run: bool) {
        self.record(BootEvent::HandingOff(plan.command_line()));
    }

    fn boot_aborted(&self, error: &BootError) {
        self.record(BootEvent::BootAborted {
            message: error.to_string(),
            exit_code: error.exit_code(),
        });
    }
}
