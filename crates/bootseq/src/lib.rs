//! Dependency-aware bootstrap sequencer.
//!
//! `bootseq` runs in front of a storage-backed server. Before handing over it
//! waits for the server's external backends to accept connections, writes the
//! runtime configuration document the server reads on startup, and runs the
//! one-shot backend initialization behind a degradation guard. The guard
//! forgives exactly one kind of failure: an optional capability that the
//! platform cannot provide (such as a PostgreSQL vector extension) while a
//! separate provider already supplies it. Finally the process image is
//! replaced with the server, so the sequencer never remains an intermediary.
//!
//! Every stage is observable through [`BootReporter`]; the production
//! [`StructuredBootReporter`] writes `tracing` events configured by
//! [`bootseq_config::Config`].

mod bootstrap;
mod env;
mod guard;
mod health;
mod probe;
mod process;
mod synth;
mod telemetry;

pub use bootstrap::{
    BootError, BootStage, ConfigLoader, EXIT_CANT_CREATE, EXIT_CONFIG, EXIT_FAILURE,
    SystemConfigLoader, run_boot,
};
pub use env::{EnvSource, MapEnv, SystemEnv};
pub use guard::{
    BackendInitializer, Classification, CommandInitializer, DegradationGuard, ErrorClassifier,
    InitError, InitOutcome, NoopInitializer, RUNTIME_CONFIG_ENV, SignatureClassifier,
};
pub use health::{BootReporter, StructuredBootReporter};
pub use probe::{
    CancellableSleeper, DependencyTarget, Interrupted, NetworkProbe, ProbeError, ProbeFailure,
    ProbeOutcome, ProbeReport, Prober, ReadinessProbe, SLEEP_SLICE, Sleeper, TargetError,
    resolve_targets,
};
pub use process::{
    DryRunReplacer, EXIT_CANNOT_EXECUTE, EXIT_NOT_FOUND, ExecPlan, ExecReplacer, Handoff,
    HandoffError, ProcessReplacer, SignalError, TERMINATION_SIGNALS, TerminationFlag, signal_name,
};
pub use synth::{
    EmbeddingParams, LlmParams, LlmProvider, MissingParameter, PostgresParams, QdrantParams,
    RedisParams, RuntimeConfig, StorageProvider, SynthesisError, SynthesizedDocument, Synthesizer,
    VECTOR_CAPABILITY, VectorProvider, WriteError,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
