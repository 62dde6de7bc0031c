//! Configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use bootseq_config::Config;
use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoError;
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader that points every path into a private temporary directory.
///
/// No profile file is created there, so the built-in profile applies.
pub struct TestConfigLoader {
    dir: TempDir,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory");
        Self { dir }
    }

    /// Directory holding the generated files.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        Utf8Path::from_path(self.dir.path()).expect("temporary directory path was not valid UTF-8")
    }

    /// Writes a boot profile that replaces the built-in one.
    pub fn write_profile(&self, json: &str) {
        fs::write(self.root().join("profile.json"), json).expect("failed to write profile");
    }

    /// Where the runtime configuration document is written.
    #[must_use]
    pub fn output_path(&self) -> Utf8PathBuf {
        self.root().join("app/config.ini")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            profile_path: self.root().join("profile.json"),
            output_path: self.output_path(),
            server_program: String::from("rag-server"),
            server_host: String::from("0.0.0.0"),
            server_port: 9621,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an invalid port.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("bootseq"),
            OsString::from("--server-port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
