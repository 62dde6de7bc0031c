//! BDD test world: owns the scripted collaborators and the boot result.

use std::cell::RefCell;
use std::sync::Arc;

use camino::Utf8PathBuf;

use crate::bootstrap::{
    BootError, BootPlan, BootServices, ConfigLoader, HandoffControl, ProbeControl, run_boot_with,
};
use crate::env::MapEnv;
use crate::guard::BackendInitializer;
use crate::process::{Handoff, TerminationFlag};

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::doubles::{RecordingReplacer, RecordingSleeper, ScriptedInitializer, ScriptedProbe};
use super::reporter::{BootEvent, RecordingBootReporter};

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    paths: Arc<TestConfigLoader>,
    loader: Arc<dyn ConfigLoader>,
    pub env: MapEnv,
    pub reporter: Arc<RecordingBootReporter>,
    pub probe: ScriptedProbe,
    pub sleeper: RecordingSleeper,
    pub initializer: ScriptedInitializer,
    pub replacer: RecordingReplacer,
    pub flag: TerminationFlag,
    profile_initializer: bool,
    result: Option<Result<Handoff, BootError>>,
}

impl TestWorld {
    /// Builds a world with a working loader and an empty environment.
    #[must_use]
    pub fn new() -> Self {
        let paths = Arc::new(TestConfigLoader::new());
        let loader: Arc<dyn ConfigLoader> = paths.clone();
        Self {
            paths,
            loader,
            env: MapEnv::new(),
            reporter: Arc::new(RecordingBootReporter::default()),
            probe: ScriptedProbe::default(),
            sleeper: RecordingSleeper::default(),
            initializer: ScriptedInitializer::default(),
            replacer: RecordingReplacer::default(),
            flag: TerminationFlag::new(),
            profile_initializer: false,
            result: None,
        }
    }

    /// Configures PostgreSQL storage with a Qdrant vector index, both
    /// reachable on the first attempt.
    pub fn use_complete_environment(&mut self) {
        self.env = MapEnv::new()
            .with("POSTGRES_HOST", "db")
            .with("POSTGRES_USER", "rag")
            .with("POSTGRES_PASSWORD", "secret")
            .with("QDRANT_URL", "http://vectors:6333")
            .with("LLM_API_KEY", "sk-test");
        self.probe.ready_on("db", 1);
        self.probe.ready_on("postgres", 1);
        self.probe.ready_on("vectors", 1);
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Arc::new(FailingConfigLoader);
    }

    /// Runs the initializer declared by `profile` instead of the scripted one.
    pub fn use_profile(&mut self, profile: &str) {
        self.paths.write_profile(profile);
        self.profile_initializer = true;
    }

    /// Runs the boot sequence once.
    pub fn boot(&mut self) {
        if self.result.is_some() {
            return;
        }
        let initializer: Option<Box<dyn BackendInitializer>> =
            if self.profile_initializer {
                None
            } else {
                Some(Box::new(self.initializer.clone()))
            };
        let plan = BootPlan {
            services: BootServices {
                loader: Arc::clone(&self.loader),
                reporter: self.reporter.clone(),
                env: Box::new(self.env.clone()),
            },
            probing: ProbeControl {
                probe: self.probe.clone(),
                sleeper: self.sleeper.clone(),
                flag: self.flag.clone(),
            },
            handoff: HandoffControl {
                initializer,
                replacer: Some(Box::new(self.replacer.clone())),
            },
        };
        self.result = Some(run_boot_with(plan));
    }

    /// Error that stopped the boot, if any.
    #[must_use]
    pub fn error(&self) -> Option<&BootError> {
        self.result.as_ref().and_then(|result| result.as_ref().err())
    }

    /// Whether the sequence reached process replacement.
    #[must_use]
    pub fn handed_off(&self) -> bool {
        matches!(self.result, Some(Ok(Handoff::Replaced))) && self.replacer.plans().len() == 1
    }

    /// Path of the runtime configuration document.
    #[must_use]
    pub fn output_path(&self) -> Utf8PathBuf {
        self.paths.output_path()
    }

    /// Recorded events matching `predicate`.
    #[must_use]
    pub fn events_where(&self, predicate: impl Fn(&BootEvent) -> bool) -> Vec<BootEvent> {
        self.reporter
            .events()
            .into_iter()
            .filter(|event| predicate(event))
            .collect()
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
