//! Process supervision: signal latching before handoff and the handoff itself.

pub(crate) mod exec;
pub(crate) mod signals;

pub use exec::{
    DryRunReplacer, EXIT_CANNOT_EXECUTE, EXIT_NOT_FOUND, ExecPlan, ExecReplacer, Handoff,
    HandoffError, ProcessReplacer,
};
pub use signals::{SignalError, TERMINATION_SIGNALS, TerminationFlag, signal_name};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
