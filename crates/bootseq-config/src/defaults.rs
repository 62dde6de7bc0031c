use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression used by the sequencer.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default location of the boot profile.
pub const DEFAULT_PROFILE_PATH: &str = "/etc/bootseq/profile.json";

/// Default location of the synthesized runtime configuration document.
pub const DEFAULT_OUTPUT_PATH: &str = "/app/config.ini";

/// Default server binary the sequencer hands off to.
pub const DEFAULT_SERVER_PROGRAM: &str = "rag-server";

/// Default bind address passed to the server.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default bind port passed to the server.
pub const DEFAULT_SERVER_PORT: u16 = 9621;

/// Default log filter expression used by the sequencer.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default console log format.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default boot profile path.
#[must_use]
pub fn default_profile_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PROFILE_PATH)
}

/// Default runtime configuration document path.
#[must_use]
pub fn default_output_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_OUTPUT_PATH)
}

/// Default server program.
#[must_use]
pub fn default_server_program() -> String {
    DEFAULT_SERVER_PROGRAM.to_owned()
}

/// Default server bind host.
#[must_use]
pub fn default_server_host() -> String {
    DEFAULT_SERVER_HOST.to_owned()
}

/// Default server bind port.
#[must_use]
pub const fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}
