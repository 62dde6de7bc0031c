//! Boot sequence orchestration.
//!
//! The sequence moves through {Not Started} → {Probing} → {Synthesizing} →
//! {Initializing} → {Handed Off}, or stops in {Aborted} with an exit code.
//! Environment input is resolved before probing so that a misconfiguration
//! aborts before any network activity. The termination flag is consulted
//! between stages and inside every blocking wait.

use std::process::ExitCode;
use std::sync::Arc;

use bootseq_config::{Config, InitializerSpec, Profile, ProfileError};
use ortho_config::OrthoError;
use strum::Display;
use thiserror::Error;

use crate::env::{EnvSource, SystemEnv};
use crate::guard::{
    BackendInitializer, CommandInitializer, DegradationGuard, InitError, InitOutcome,
    NoopInitializer, SignatureClassifier,
};
use crate::health::{BootReporter, StructuredBootReporter};
use crate::probe::{
    CancellableSleeper, NetworkProbe, ProbeError, Prober, ReadinessProbe, Sleeper, TargetError,
    resolve_targets,
};
use crate::process::{
    DryRunReplacer, ExecPlan, ExecReplacer, Handoff, HandoffError, ProcessReplacer, SignalError,
    TerminationFlag,
};
use crate::synth::{RuntimeConfig, SynthesisError, Synthesizer, WriteError};
use crate::telemetry::{self, TelemetryError};

/// `EX_CONFIG` from `sysexits.h`.
pub const EXIT_CONFIG: u8 = 78;

/// `EX_CANTCREAT` from `sysexits.h`.
pub const EXIT_CANT_CREATE: u8 = 73;

/// Exit code for fatal initialization failures and internal errors.
pub const EXIT_FAILURE: u8 = 1;

/// Stage of the boot state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BootStage {
    /// Configuration, profile and environment are being resolved.
    NotStarted,
    /// Waiting for dependency targets.
    Probing,
    /// Writing the runtime configuration document.
    Synthesizing,
    /// Running the guarded backend initialization.
    Initializing,
    /// Control passed to the server.
    HandedOff,
    /// Stopped without handing off.
    Aborted,
}

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the sequencer configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

impl<T> ConfigLoader for Arc<T>
where
    T: ConfigLoader + ?Sized,
{
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        (**self).load()
    }
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Reasons the sequence stopped without handing off.
#[derive(Debug, Error)]
pub enum BootError {
    /// Sequencer configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Termination handlers could not be installed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying signal error.
        #[source]
        source: SignalError,
    },
    /// The HTTP client used for readiness checks could not be built.
    #[error("failed to build readiness client: {source}")]
    ProbeClient {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The boot profile is unreadable or invalid.
    #[error("failed to load boot profile: {source}")]
    Profile {
        /// Underlying profile error.
        #[source]
        source: ProfileError,
    },
    /// Environment input does not satisfy the selected providers.
    #[error("misconfiguration: {source}")]
    Misconfiguration {
        /// Underlying synthesis error.
        #[source]
        source: SynthesisError,
    },
    /// A dependency target's address variables are malformed.
    #[error("misconfiguration: {source}")]
    Target {
        /// Underlying target error.
        #[source]
        source: TargetError,
    },
    /// The runtime configuration document could not be written.
    #[error("failed to write runtime configuration: {source}")]
    Write {
        /// Underlying write error.
        #[source]
        source: WriteError,
    },
    /// Backend initialization failed and was not forgivable.
    #[error("backend initialization failed: {source}")]
    Initialization {
        /// Original initialization error.
        #[source]
        source: InitError,
    },
    /// The server could not be executed.
    #[error("handoff failed: {source}")]
    Handoff {
        /// Underlying exec error.
        #[source]
        source: HandoffError,
    },
    /// A termination signal arrived before handoff.
    #[error("interrupted by signal {signal} during {stage}")]
    Interrupted {
        /// Stage that was running.
        stage: BootStage,
        /// Signal received.
        signal: i32,
    },
}

impl BootError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration { .. }
            | Self::Telemetry { .. }
            | Self::Profile { .. }
            | Self::Misconfiguration { .. }
            | Self::Target { .. } => EXIT_CONFIG,
            Self::Write { .. } => EXIT_CANT_CREATE,
            Self::Signals { .. } | Self::ProbeClient { .. } | Self::Initialization { .. } => {
                EXIT_FAILURE
            }
            Self::Handoff { source } => source.exit_code(),
            Self::Interrupted { signal, .. } => signal_exit_code(*signal),
        }
    }

    /// Signal that stopped the sequence, if any.
    #[must_use]
    pub const fn interrupted_by(&self) -> Option<i32> {
        match self {
            Self::Interrupted { signal, .. } => Some(*signal),
            _ => None,
        }
    }

    /// Whether the failure happened before the boot log was available.
    ///
    /// Such failures are only visible when written to stderr directly.
    #[must_use]
    pub const fn precedes_telemetry(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::Telemetry { .. }
                | Self::Signals { .. }
                | Self::ProbeClient { .. }
        )
    }
}

fn signal_exit_code(signal: i32) -> u8 {
    u8::try_from(signal.saturating_add(128)).unwrap_or(u8::MAX)
}

impl From<BootError> for ExitCode {
    fn from(error: BootError) -> Self {
        Self::from(error.exit_code())
    }
}

/// Collaborators that load configuration and observe the sequence.
pub(crate) struct BootServices<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn BootReporter>,
    pub(crate) env: Box<dyn EnvSource>,
}

/// Collaborators that wait on dependencies.
pub(crate) struct ProbeControl<P, S> {
    pub(crate) probe: P,
    pub(crate) sleeper: S,
    pub(crate) flag: TerminationFlag,
}

/// Collaborators for the last two stages. `None` selects the implementation
/// implied by the profile and configuration.
#[derive(Default)]
pub(crate) struct HandoffControl {
    pub(crate) initializer: Option<Box<dyn BackendInitializer>>,
    pub(crate) replacer: Option<Box<dyn ProcessReplacer>>,
}

/// Everything required to run the boot sequence.
pub(crate) struct BootPlan<L, P, S> {
    pub(crate) services: BootServices<L>,
    pub(crate) probing: ProbeControl<P, S>,
    pub(crate) handoff: HandoffControl,
}

/// Runs the boot sequence with the production collaborators.
pub fn run_boot() -> Result<Handoff, BootError> {
    let flag = TerminationFlag::install().map_err(|source| BootError::Signals { source })?;
    let probe = NetworkProbe::new().map_err(|source| BootError::ProbeClient { source })?;
    let plan = BootPlan {
        services: BootServices {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredBootReporter::new()),
            env: Box::new(SystemEnv),
        },
        probing: ProbeControl {
            probe,
            sleeper: CancellableSleeper::new(flag.clone()),
            flag,
        },
        handoff: HandoffControl::default(),
    };
    run_boot_with(plan)
}

/// Runs the boot sequence with injected collaborators.
pub(crate) fn run_boot_with<L, P, S>(plan: BootPlan<L, P, S>) -> Result<Handoff, BootError>
where
    L: ConfigLoader,
    P: ReadinessProbe,
    S: Sleeper,
{
    let reporter = Arc::clone(&plan.services.reporter);
    let result = sequence(plan);
    if let Err(error) = &result {
        reporter.stage_entered(BootStage::Aborted);
        reporter.boot_aborted(error);
    }
    result
}

fn sequence<L, P, S>(plan: BootPlan<L, P, S>) -> Result<Handoff, BootError>
where
    L: ConfigLoader,
    P: ReadinessProbe,
    S: Sleeper,
{
    let BootPlan {
        services,
        probing,
        handoff,
    } = plan;
    let BootServices {
        loader,
        reporter,
        env,
    } = services;
    let ProbeControl {
        probe,
        sleeper,
        flag,
    } = probing;

    let config = loader
        .load()
        .map_err(|source| BootError::Configuration { source })?;
    telemetry::initialise(&config).map_err(|source| BootError::Telemetry { source })?;

    let loaded = Profile::load_or_builtin(config.profile_path())
        .map_err(|source| BootError::Profile { source })?;
    reporter.boot_starting(&loaded.origin());
    let profile = loaded.into_profile();
    let signatures = profile
        .signature_set()
        .map_err(|source| BootError::Profile { source })?;

    let runtime = RuntimeConfig::from_env(env.as_ref())
        .map_err(|source| BootError::Misconfiguration { source })?;
    let targets = resolve_targets(&profile.targets, env.as_ref())
        .map_err(|source| BootError::Target { source })?;
    reporter.runtime_resolved(&runtime);
    checkpoint(&flag, BootStage::NotStarted)?;

    reporter.stage_entered(BootStage::Probing);
    Prober::new(probe, sleeper, Arc::clone(&reporter))
        .probe_all(&targets)
        .map_err(|ProbeError::Interrupted { signal, .. }| BootError::Interrupted {
            stage: BootStage::Probing,
            signal,
        })?;
    checkpoint(&flag, BootStage::Probing)?;

    reporter.stage_entered(BootStage::Synthesizing);
    let document = Synthesizer::new(config.output_path())
        .write(&runtime)
        .map_err(|source| BootError::Write { source })?;
    reporter.document_written(&document);
    checkpoint(&flag, BootStage::Synthesizing)?;

    reporter.stage_entered(BootStage::Initializing);
    let HandoffControl {
        initializer,
        replacer,
    } = handoff;
    let initializer =
        initializer.unwrap_or_else(|| profile_initializer(profile.initializer, &flag));
    let guard = DegradationGuard::new(SignatureClassifier::new(signatures));
    match guard.initialize(initializer.as_ref(), &document.path, &runtime) {
        Ok(InitOutcome::Clean) => reporter.initialization_succeeded(),
        Ok(InitOutcome::Degraded {
            capability,
            fallback,
            message,
        }) => reporter.initialization_degraded(&capability, &fallback, &message),
        Err(error) => {
            if let Some(signal) = error.interrupted_by() {
                return Err(BootError::Interrupted {
                    stage: BootStage::Initializing,
                    signal,
                });
            }
            reporter.initialization_failed(&error);
            return Err(BootError::Initialization { source: error });
        }
    }
    checkpoint(&flag, BootStage::Initializing)?;

    let exec = ExecPlan::for_server(&config, &document.path);
    let replacer = replacer.unwrap_or_else(|| configured_replacer(&config));
    reporter.handing_off(&exec, config.dry_run());
    reporter.stage_entered(BootStage::HandedOff);
    replacer
        .replace(&exec)
        .map_err(|source| BootError::Handoff { source })
}

fn profile_initializer(
    spec: Option<InitializerSpec>,
    flag: &TerminationFlag,
) -> Box<dyn BackendInitializer> {
    match spec {
        Some(spec) => Box::new(CommandInitializer::new(spec, flag.clone())),
        None => Box::new(NoopInitializer),
    }
}

fn configured_replacer(config: &Config) -> Box<dyn ProcessReplacer> {
    if config.dry_run() {
        Box::new(DryRunReplacer)
    } else {
        Box::new(ExecReplacer)
    }
}

fn checkpoint(flag: &TerminationFlag, stage: BootStage) -> Result<(), BootError> {
    flag.raised()
        .map_or(Ok(()), |signal| Err(BootError::Interrupted { stage, signal }))
}
