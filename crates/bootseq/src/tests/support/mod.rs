//! Test doubles and the scenario world for the boot sequence suites.

mod config_loader;
mod doubles;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use doubles::{RecordingReplacer, RecordingSleeper, ScriptedInitializer, ScriptedProbe};
pub use reporter::{BootEvent, RecordingBootReporter};
pub use world::{TestWorld, world};
