//! Hands the process over to the real server.

use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command;

use bootseq_config::Config;
use camino::Utf8Path;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Exit code reported when the server program cannot be found.
pub const EXIT_NOT_FOUND: u8 = 127;

/// Exit code reported when the server program exists but cannot run.
pub const EXIT_CANNOT_EXECUTE: u8 = 126;

/// Command line the sequencer replaces itself with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecPlan {
    program: String,
    args: Vec<String>,
}

impl ExecPlan {
    /// Builds a plan from an explicit program and argument list.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Builds the server command line: bindings, document path, extra args.
    #[must_use]
    pub fn for_server(config: &Config, document: &Utf8Path) -> Self {
        let mut args = vec![
            String::from("--host"),
            config.server_host().to_owned(),
            String::from("--port"),
            config.server_port().to_string(),
            String::from("--config"),
            document.to_string(),
        ];
        args.extend(config.server_args().iter().cloned());
        Self::new(config.server_program(), args)
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &str {
        self.program.as_str()
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.args.as_slice()
    }

    /// Shell-like rendering used in the boot log.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_./:=,@%+".contains(ch));
    if plain {
        word.to_owned()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// How control left the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// The process image was replaced. Only test doubles observe this value;
    /// a real replacement never returns.
    Replaced,
    /// Dry run: the command was logged instead of executed.
    DryRun,
}

/// Errors raised when the server cannot be executed.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// `exec` returned, which only happens on failure.
    #[error("failed to exec '{program}': {source}")]
    Exec {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl HandoffError {
    /// Shell-compatible exit code for the failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Exec { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                EXIT_NOT_FOUND
            }
            Self::Exec { .. } => EXIT_CANNOT_EXECUTE,
        }
    }
}

/// Abstraction over the final handoff so tests can observe it.
pub trait ProcessReplacer {
    /// Replaces the current process with `plan`.
    fn replace(&self, plan: &ExecPlan) -> Result<Handoff, HandoffError>;
}

impl<T> ProcessReplacer for Box<T>
where
    T: ProcessReplacer + ?Sized,
{
    fn replace(&self, plan: &ExecPlan) -> Result<Handoff, HandoffError> {
        (**self).replace(plan)
    }
}

/// Replaces the process image with `exec(3)`, inheriting the environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecReplacer;

impl ProcessReplacer for ExecReplacer {
    fn replace(&self, plan: &ExecPlan) -> Result<Handoff, HandoffError> {
        info!(
            target: PROCESS_TARGET,
            program = plan.program(),
            "replacing process image"
        );
        let source = Command::new(plan.program()).args(plan.args()).exec();
        Err(HandoffError::Exec {
            program: plan.program().to_owned(),
            source,
        })
    }
}

/// Logs the command and returns without replacing the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunReplacer;

impl ProcessReplacer for DryRunReplacer {
    fn replace(&self, plan: &ExecPlan) -> Result<Handoff, HandoffError> {
        info!(
            target: PROCESS_TARGET,
            event = "dry_run",
            command = %plan.command_line(),
            "dry run requested; not replacing process"
        );
        Ok(Handoff::DryRun)
    }
}
