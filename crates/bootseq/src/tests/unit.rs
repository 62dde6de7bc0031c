//! Unit tests for boot error classification and stage reporting.

use std::io;
use std::sync::Arc;

use rstest::rstest;

use crate::bootstrap::{BootError, BootStage, ConfigLoader, EXIT_CANT_CREATE, EXIT_CONFIG};
use crate::guard::InitError;
use crate::process::HandoffError;
use crate::synth::{MissingParameter, SynthesisError, WriteError};

use super::support::{FailingConfigLoader, TestConfigLoader};

fn misconfiguration() -> BootError {
    BootError::Misconfiguration {
        source: SynthesisError::MissingParameters {
            missing: vec![MissingParameter {
                variable: String::from("POSTGRES_PASSWORD"),
                required_by: String::from("storage provider postgres"),
            }],
        },
    }
}

fn exec_failure(kind: io::ErrorKind) -> BootError {
    BootError::Handoff {
        source: HandoffError::Exec {
            program: String::from("rag-server"),
            source: io::Error::from(kind),
        },
    }
}

#[rstest]
#[case(misconfiguration(), EXIT_CONFIG)]
#[case(
    BootError::Write {
        source: WriteError::Persist {
            path: "/app/config.ini".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        },
    },
    EXIT_CANT_CREATE
)]
#[case(BootError::Initialization { source: InitError::new("boom") }, 1)]
#[case(exec_failure(io::ErrorKind::NotFound), 127)]
#[case(exec_failure(io::ErrorKind::PermissionDenied), 126)]
#[case(BootError::Interrupted { stage: BootStage::Initializing, signal: 15 }, 143)]
fn exit_codes_match_failure_kind(#[case] error: BootError, #[case] expected: u8) {
    assert_eq!(error.exit_code(), expected);
}

#[test]
fn misconfiguration_names_missing_variable() {
    let message = misconfiguration().to_string();
    assert!(message.contains("POSTGRES_PASSWORD"), "{message}");
    assert!(!misconfiguration().precedes_telemetry());
}

#[test]
fn configuration_failures_precede_telemetry() {
    let error = FailingConfigLoader.load().expect_err("invalid port must fail");
    let boot_error = BootError::Configuration { source: error };
    assert!(boot_error.precedes_telemetry());
    assert_eq!(boot_error.exit_code(), EXIT_CONFIG);
}

#[test]
fn arc_loader_delegates() {
    let loader: Arc<dyn ConfigLoader> = Arc::new(TestConfigLoader::new());
    let config = loader.load().expect("test loader succeeds");
    assert_eq!(config.server_port(), 9621);
    assert!(config.output_path().ends_with("app/config.ini"));
}

#[rstest]
#[case(BootStage::NotStarted, "not_started")]
#[case(BootStage::HandedOff, "handed_off")]
fn stages_render_in_snake_case(#[case] stage: BootStage, #[case] expected: &str) {
    assert_eq!(stage.to_string(), expected);
}
