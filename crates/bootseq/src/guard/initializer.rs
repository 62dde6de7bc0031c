//! Backend initialization behind an injectable seam.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use bootseq_config::InitializerSpec;
use camino::Utf8Path;
use thiserror::Error;
use tracing::debug;

use crate::probe::SLEEP_SLICE;
use crate::process::{PROCESS_TARGET, TerminationFlag, signal_name};

/// Variable through which the initializer learns the document path.
pub const RUNTIME_CONFIG_ENV: &str = "BOOTSEQ_RUNTIME_CONFIG";

/// Failure reported by a [`BackendInitializer`].
///
/// The message is the backend's own error text and is what classification
/// operates on.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct InitError {
    message: String,
    interrupted_by: Option<i32>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl InitError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            interrupted_by: None,
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            interrupted_by: None,
            source: Some(source.into()),
        }
    }

    /// Builds an error for an initialization cut short by `signal`.
    #[must_use]
    pub fn interrupted(signal: i32) -> Self {
        Self {
            message: format!("initialization interrupted by {}", signal_name(signal)),
            interrupted_by: Some(signal),
            source: None,
        }
    }

    /// Backend error text.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Signal that interrupted initialization, if any.
    #[must_use]
    pub const fn interrupted_by(&self) -> Option<i32> {
        self.interrupted_by
    }
}

/// Performs the one-shot backend initialization.
pub trait BackendInitializer {
    /// Initializes storage backends using the document at `document`.
    fn initialize(&self, document: &Utf8Path) -> Result<(), InitError>;
}

impl<T> BackendInitializer for Box<T>
where
    T: BackendInitializer + ?Sized,
{
    fn initialize(&self, document: &Utf8Path) -> Result<(), InitError> {
        (**self).initialize(document)
    }
}

/// Initializer used when the profile declares none.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInitializer;

impl BackendInitializer for NoopInitializer {
    fn initialize(&self, _document: &Utf8Path) -> Result<(), InitError> {
        Ok(())
    }
}

/// Runs the profile's initializer command and waits for it.
///
/// Output is captured to anonymous temporary files so a chatty initializer
/// cannot block on a full pipe. A termination signal kills the child.
#[derive(Debug, Clone)]
pub struct CommandInitializer {
    spec: InitializerSpec,
    flag: TerminationFlag,
}

impl CommandInitializer {
    /// Builds an initializer for `spec` that observes `flag`.
    #[must_use]
    pub fn new(spec: InitializerSpec, flag: TerminationFlag) -> Self {
        Self { spec, flag }
    }

    fn spawn_error(&self, source: io::Error) -> InitError {
        InitError::with_source(
            format!("failed to run initializer '{}': {source}", self.spec.program),
            source,
        )
    }
}

impl BackendInitializer for CommandInitializer {
    fn initialize(&self, document: &Utf8Path) -> Result<(), InitError> {
        let mut stdout = tempfile::tempfile().map_err(|error| self.spawn_error(error))?;
        let mut stderr = tempfile::tempfile().map_err(|error| self.spawn_error(error))?;
        let child_stdout = stdout.try_clone().map_err(|error| self.spawn_error(error))?;
        let child_stderr = stderr.try_clone().map_err(|error| self.spawn_error(error))?;

        debug!(
            target: PROCESS_TARGET,
            program = %self.spec.program,
            args = ?self.spec.args,
            "running backend initializer"
        );
        let mut child = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .env(RUNTIME_CONFIG_ENV, document.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::from(child_stdout))
            .stderr(Stdio::from(child_stderr))
            .spawn()
            .map_err(|error| self.spawn_error(error))?;

        let status = loop {
            if let Some(status) = child.try_wait().map_err(|error| self.spawn_error(error))? {
                break status;
            }
            if let Some(signal) = self.flag.raised() {
                // The child may already have exited.
                let _ = child.kill();
                let _ = child.wait();
                return Err(InitError::interrupted(signal));
            }
            thread::sleep(SLEEP_SLICE);
        };

        if status.success() {
            return Ok(());
        }
        Err(failure(status, &mut stdout, &mut stderr))
    }
}

/// Everything a failed initializer printed on the stream its error came from.
#[derive(Debug, Error)]
#[error("{0}")]
struct CapturedOutput(String);

/// Builds the error for a failed run. Only the final line is the error; any
/// earlier lines (progress, warnings) travel as the source.
fn failure(status: ExitStatus, stdout: &mut File, stderr: &mut File) -> InitError {
    let stderr_text = captured(stderr);
    let output = if stderr_text.is_empty() {
        captured(stdout)
    } else {
        stderr_text
    };
    let message = final_line(&output);
    if message.is_empty() {
        InitError::new(format!("initializer exited with {status}"))
    } else if message.len() == output.len() {
        InitError::new(output)
    } else {
        InitError::with_source(message, CapturedOutput(output.clone()))
    }
}

/// Last non-empty line of `text`, trimmed.
pub(super) fn final_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .unwrap_or_default()
}

fn captured(file: &mut File) -> String {
    let mut text = String::new();
    if file.seek(SeekFrom::Start(0)).is_ok() {
        let mut bytes = Vec::new();
        if file.read_to_end(&mut bytes).is_ok() {
            text = String::from_utf8_lossy(&bytes).trim().to_owned();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use signal_hook::consts::signal::SIGTERM;

    use super::*;

    fn shell(script: &str) -> InitializerSpec {
        InitializerSpec {
            program: String::from("sh"),
            args: vec![String::from("-c"), script.to_owned()],
        }
    }

    fn run(script: &str) -> Result<(), InitError> {
        CommandInitializer::new(shell(script), TerminationFlag::new())
            .initialize(Utf8Path::new("/tmp/bootseq-config.ini"))
    }

    #[test]
    fn successful_command_succeeds() {
        run("exit 0").expect("initializer succeeds");
    }

    #[test]
    fn failure_reports_stderr() {
        let error = run("echo progress; echo 'extension \"vector\" is not available' >&2; exit 3")
            .expect_err("initializer fails");
        assert_eq!(error.message(), "extension \"vector\" is not available");
        assert_eq!(error.interrupted_by(), None);
    }

    #[test]
    fn failure_reports_only_final_stderr_line() {
        let error = run(
            "echo 'WARNING: extension \"vector\" is not available, continuing' >&2; \
             echo 'FATAL: password authentication failed for user \"rag\"' >&2; exit 1",
        )
        .expect_err("initializer fails");
        assert_eq!(
            error.message(),
            "FATAL: password authentication failed for user \"rag\""
        );
        let output = std::error::Error::source(&error)
            .expect("full output kept")
            .to_string();
        assert!(output.starts_with("WARNING: extension"), "{output}");
        assert!(output.ends_with("for user \"rag\""), "{output}");
    }

    #[rstest]
    #[case("", "")]
    #[case("single", "single")]
    #[case("first\n  second  \n\n", "second")]
    fn final_line_skips_trailing_blank_lines(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(final_line(text), expected);
    }

    #[test]
    fn failure_falls_back_to_stdout() {
        let error = run("echo 'password authentication failed'; exit 1")
            .expect_err("initializer fails");
        assert_eq!(error.message(), "password authentication failed");
    }

    #[test]
    fn silent_failure_names_exit_status() {
        let error = run("exit 4").expect_err("initializer fails");
        assert!(error.message().starts_with("initializer exited with"));
    }

    #[test]
    fn document_path_is_exported() {
        run("test \"$BOOTSEQ_RUNTIME_CONFIG\" = /tmp/bootseq-config.ini")
            .expect("document path is visible to the initializer");
    }

    #[test]
    fn missing_program_is_an_error() {
        let spec = InitializerSpec {
            program: String::from("/nonexistent/bootseq-initializer"),
            args: Vec::new(),
        };
        let error = CommandInitializer::new(spec, TerminationFlag::new())
            .initialize(Utf8Path::new("/tmp/config.ini"))
            .expect_err("spawn fails");
        assert!(error.message().contains("failed to run initializer"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn raised_flag_kills_initializer() {
        let flag = TerminationFlag::new();
        flag.raise(SIGTERM);
        let error = CommandInitializer::new(shell("sleep 30"), flag)
            .initialize(Utf8Path::new("/tmp/config.ini"))
            .expect_err("initializer interrupted");
        assert_eq!(error.interrupted_by(), Some(SIGTERM));
    }

    #[test]
    fn noop_initializer_succeeds() {
        NoopInitializer
            .initialize(Utf8Path::new("/tmp/config.ini"))
            .expect("noop succeeds");
    }
}
