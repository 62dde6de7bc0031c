//! Shared configuration for the `bootseq` bootstrap sequencer.
//!
//! Two documents steer a boot. [`Config`] holds the sequencer's own settings
//! (logging, where the boot profile and the runtime configuration document
//! live, and which server to hand off to); it is layered by `ortho_config`
//! from defaults, an optional configuration file, `BOOTSEQ_*` environment
//! variables and command-line flags, in increasing order of precedence.
//! [`Profile`] is the versioned description of the dependencies to wait for,
//! the initialization failures that may be forgiven, and the initializer to
//! run. It is kept outside the binary so that service variants differ by
//! configuration rather than by code.

use std::ffi::OsString;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

mod defaults;
mod endpoint;
mod logging;
mod profile;
mod signature;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_OUTPUT_PATH, DEFAULT_PROFILE_PATH, DEFAULT_SERVER_HOST,
    DEFAULT_SERVER_PORT, DEFAULT_SERVER_PROGRAM, default_log_filter, default_log_filter_string,
    default_log_format, default_output_path, default_profile_path, default_server_host,
    default_server_port, default_server_program,
};
pub use endpoint::{
    DEFAULT_EXPECTED_STATUS, EndpointError, ProbeEndpoint, ReadinessCheck, url_authority,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use profile::{
    DEFAULT_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_MS, InitializerSpec, PROFILE_VERSION,
    Profile, ProfileError, ProfileSource, ProviderSelection, TargetSpec,
};
pub use signature::{DegradationSignature, MIN_PATTERN_LEN, SignatureError, SignatureSet};

/// Sequencer configuration resolved from every configuration layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "BOOTSEQ")]
pub struct Config {
    /// `tracing` filter expression for the boot log.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format of the boot log.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Location of the boot profile.
    #[serde(default = "default_profile_path")]
    pub profile_path: Utf8PathBuf,
    /// Location the runtime configuration document is written to.
    #[serde(default = "default_output_path")]
    pub output_path: Utf8PathBuf,
    /// Server binary that replaces the sequencer.
    #[serde(default = "default_server_program")]
    pub server_program: String,
    /// Extra arguments appended to the server command line.
    #[serde(default)]
    pub server_args: Vec<String>,
    /// Address the server binds to.
    #[serde(default = "default_server_host")]
    pub server_host: String,
    /// Port the server binds to.
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Runs every stage but logs the exec command instead of handing off.
    #[serde(default)]
    pub dry_run: bool,
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration using the supplied argument list.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// `tracing` filter expression for the boot log.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format of the boot log.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Location of the boot profile.
    #[must_use]
    pub fn profile_path(&self) -> &Utf8Path {
        self.profile_path.as_path()
    }

    /// Location of the runtime configuration document.
    #[must_use]
    pub fn output_path(&self) -> &Utf8Path {
        self.output_path.as_path()
    }

    /// Server binary that replaces the sequencer.
    #[must_use]
    pub fn server_program(&self) -> &str {
        self.server_program.as_str()
    }

    /// Extra server arguments.
    #[must_use]
    pub fn server_args(&self) -> &[String] {
        self.server_args.as_slice()
    }

    /// Address the server binds to.
    #[must_use]
    pub fn server_host(&self) -> &str {
        self.server_host.as_str()
    }

    /// Port the server binds to.
    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }

    /// Whether handoff is replaced by logging the exec command.
    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.dry_run
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            profile_path: default_profile_path(),
            output_path: default_output_path(),
            server_program: default_server_program(),
            server_args: Vec::new(),
            server_host: default_server_host(),
            server_port: default_server_port(),
            dry_run: false,
        }
    }
}
