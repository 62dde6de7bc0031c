//! Tests that exercise the crate's public re-exports.

use camino::Utf8Path;
use rstest::rstest;

use crate::{
    BootError, BootStage, DegradationGuard, EXIT_CONFIG, ExecPlan, InitOutcome, MapEnv,
    NoopInitializer, RuntimeConfig, SignatureClassifier, Synthesizer,
};

#[rstest]
fn public_api_resolves_writes_and_guards() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let root = Utf8Path::from_path(dir.path()).expect("UTF-8 temp dir");
    let env = MapEnv::new()
        .with("STORAGE_PROVIDER", "json")
        .with("VECTOR_PROVIDER", "nano")
        .with("LLM_PROVIDER", "ollama");

    let runtime = RuntimeConfig::from_env(&env).expect("configuration resolves");
    let document = Synthesizer::new(root.join("config.ini"))
        .write(&runtime)
        .expect("document written");
    let outcome = DegradationGuard::new(SignatureClassifier::default())
        .initialize(&NoopInitializer, &document.path, &runtime)
        .expect("noop initializer succeeds");

    assert_eq!(outcome, InitOutcome::Clean);
    assert_eq!(
        ExecPlan::new("rag-server", vec![document.path.to_string()]).command_line(),
        format!("rag-server {}", document.path)
    );
}

#[rstest]
fn interruption_exit_codes_follow_shell_convention() {
    let error = BootError::Interrupted {
        stage: BootStage::Probing,
        signal: 2,
    };
    assert_eq!(error.exit_code(), 130);
    assert_eq!(error.to_string(), "interrupted by signal 2 during probing");
    assert_ne!(error.exit_code(), EXIT_CONFIG);
}
