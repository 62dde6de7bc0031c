//! Boot log: structured reporting of every sequencer stage.
//!
//! Passwords and API keys never reach this module's log fields; only
//! provider selections, hosts and the document digest are reported.

use std::sync::Arc;

use crate::bootstrap::{BootError, BootStage};
use crate::guard::InitError;
use crate::probe::{DependencyTarget, ProbeFailure};
use crate::process::{ExecPlan, signal_name};
use crate::synth::{RuntimeConfig, SynthesizedDocument};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");
const PROBE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::probe");

/// Observer notified as the boot sequence progresses.
pub trait BootReporter: Send + Sync {
    /// Invoked once the boot profile has been loaded.
    fn boot_starting(&self, profile_origin: &str);

    /// Invoked when the sequence enters `stage`.
    fn stage_entered(&self, stage: BootStage);

    /// Invoked after the environment resolved into a runtime configuration.
    fn runtime_resolved(&self, config: &RuntimeConfig);

    /// Invoked for targets without a configured address.
    fn probe_skipped(&self, target: &DependencyTarget);

    /// Invoked after each failed readiness attempt.
    fn probe_failed(&self, target: &DependencyTarget, attempt: u32, failure: &ProbeFailure);

    /// Invoked when a target answers.
    fn probe_ready(&self, target: &DependencyTarget, attempts: u32);

    /// Invoked when a target's attempt budget runs out.
    fn probe_exhausted(&self, target: &DependencyTarget, attempts: u32, last_error: &str);

    /// Invoked after the runtime configuration document was written.
    fn document_written(&self, document: &SynthesizedDocument);

    /// Invoked when backend initialization succeeds outright.
    fn initialization_succeeded(&self);

    /// Invoked when initialization continues on a fallback provider.
    fn initialization_degraded(&self, capability: &str, fallback: &str, message: &str);

    /// Invoked when initialization fails fatally.
    fn initialization_failed(&self, error: &InitError);

    /// Invoked immediately before the process hands off to the server.
    fn handing_off(&self, plan: &ExecPlan, dry_run: bool);

    /// Invoked when the sequence stops without handing off.
    fn boot_aborted(&self, error: &BootError);
}

impl<T> BootReporter for Arc<T>
where
    T: BootReporter + ?Sized,
{
    fn boot_starting(&self, profile_origin: &str) {
        (**self).boot_starting(profile_origin);
    }

    fn stage_entered(&self, stage: BootStage) {
        (**self).stage_entered(stage);
    }

    fn runtime_resolved(&self, config: &RuntimeConfig) {
        (**self).runtime_resolved(config);
    }

    fn probe_skipped(&self, target: &DependencyTarget) {
        (**self).probe_skipped(target);
    }

    fn probe_failed(&self, target: &DependencyTarget, attempt: u32, failure: &ProbeFailure) {
        (**self).probe_failed(target, attempt, failure);
    }

    fn probe_ready(&self, target: &DependencyTarget, attempts: u32) {
        (**self).probe_ready(target, attempts);
    }

    fn probe_exhausted(&self, target: &DependencyTarget, attempts: u32, last_error: &str) {
        (**self).probe_exhausted(target, attempts, last_error);
    }

    fn document_written(&self, document: &SynthesizedDocument) {
        (**self).document_written(document);
    }

    fn initialization_succeeded(&self) {
        (**self).initialization_succeeded();
    }

    fn initialization_degraded(&self, capability: &str, fallback: &str, message: &str) {
        (**self).initialization_degraded(capability, fallback, message);
    }

    fn initialization_failed(&self, error: &InitError) {
        (**self).initialization_failed(error);
    }

    fn handing_off(&self, plan: &ExecPlan, dry_run: bool) {
        (**self).handing_off(plan, dry_run);
    }

    fn boot_aborted(&self, error: &BootError) {
        (**self).boot_aborted(error);
    }
}

/// Default reporter that records boot events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredBootReporter;

impl StructuredBootReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn endpoint_label(target: &DependencyTarget) -> String {
    target
        .endpoint()
        .map_or_else(String::new, ToString::to_string)
}

impl BootReporter for StructuredBootReporter {
    fn boot_starting(&self, profile_origin: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "boot_starting",
            profile = profile_origin,
            "starting boot sequence"
        );
    }

    fn stage_entered(&self, stage: BootStage) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "stage_entered",
            %stage,
            "entering stage"
        );
    }

    fn runtime_resolved(&self, config: &RuntimeConfig) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "runtime_resolved",
            project = %config.project,
            collection = %config.collection,
            storage = %config.storage,
            vector = %config.vector,
            llm = %config.llm.provider,
            cache = config.redis.is_some(),
            "runtime configuration resolved"
        );
    }

    fn probe_skipped(&self, target: &DependencyTarget) {
        tracing::debug!(
            target: PROBE_TARGET,
            event = "probe_skipped",
            dependency = target.name(),
            "no address configured; not waiting"
        );
    }

    fn probe_failed(&self, target: &DependencyTarget, attempt: u32, failure: &ProbeFailure) {
        tracing::info!(
            target: PROBE_TARGET,
            event = "probe_attempt",
            dependency = target.name(),
            endpoint = %endpoint_label(target),
            attempt,
            max_attempts = target.max_attempts(),
            error = %failure,
            "waiting for dependency"
        );
    }

    fn probe_ready(&self, target: &DependencyTarget, attempts: u32) {
        tracing::info!(
            target: PROBE_TARGET,
            event = "probe_ready",
            dependency = target.name(),
            endpoint = %endpoint_label(target),
            attempts,
            "dependency ready"
        );
    }

    fn probe_exhausted(&self, target: &DependencyTarget, attempts: u32, last_error: &str) {
        tracing::warn!(
            target: PROBE_TARGET,
            event = "probe_exhausted",
            dependency = target.name(),
            endpoint = %endpoint_label(target),
            attempts,
            error = last_error,
            "dependency not ready after {attempts} attempts; continuing"
        );
    }

    fn document_written(&self, document: &SynthesizedDocument) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "document_written",
            path = %document.path,
            bytes = document.bytes,
            sha256 = %document.digest,
            "runtime configuration written"
        );
    }

    fn initialization_succeeded(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "initialization_succeeded",
            "backends initialized"
        );
    }

    fn initialization_degraded(&self, capability: &str, fallback: &str, message: &str) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "initialization_degraded",
            capability,
            fallback,
            error = message,
            "optional capability '{capability}' unavailable; continuing with {fallback}"
        );
    }

    fn initialization_failed(&self, error: &InitError) {
        let output = std::error::Error::source(error)
            .map(ToString::to_string)
            .unwrap_or_default();
        tracing::error!(
            target: HEALTH_TARGET,
            event = "initialization_failed",
            error = %error,
            output,
            "backend initialization failed"
        );
    }

    fn handing_off(&self, plan: &ExecPlan, dry_run: bool) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "handing_off",
            command = %plan.command_line(),
            dry_run,
            "handing off to server"
        );
    }

    fn boot_aborted(&self, error: &BootError) {
        match error.interrupted_by() {
            Some(signal) => tracing::warn!(
                target: HEALTH_TARGET,
                event = "boot_interrupted",
                signal = %signal_name(signal),
                exit_code = error.exit_code(),
                "boot sequence interrupted"
            ),
            None => tracing::error!(
                target: HEALTH_TARGET,
                event = "boot_aborted",
                error = %error,
                exit_code = error.exit_code(),
                "boot sequence aborted"
            ),
        }
    }
}
