//! Configuration synthesizer.
//!
//! Environment input is resolved into a [`RuntimeConfig`] first, entirely in
//! memory, so a misconfiguration aborts the boot before any network activity.
//! The document itself is written later by [`Synthesizer::write`], after the
//! dependencies have been probed.

use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};

mod errors;
mod files;
mod render;
mod runtime_config;

pub use errors::{MissingParameter, SynthesisError, WriteError};
pub use runtime_config::{
    EmbeddingParams, LlmParams, LlmProvider, PostgresParams, QdrantParams, RedisParams,
    RuntimeConfig, StorageProvider, VECTOR_CAPABILITY, VectorProvider,
};

/// Summary of a written document, safe to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedDocument {
    /// Where the document was written.
    pub path: Utf8PathBuf,
    /// Document size in bytes.
    pub bytes: usize,
    /// Hex-encoded SHA-256 of the contents.
    pub digest: String,
}

/// Writes the runtime configuration document to a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesizer {
    output_path: Utf8PathBuf,
}

impl Synthesizer {
    /// Builds a synthesizer writing to `output_path`.
    #[must_use]
    pub fn new(output_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    /// Target path.
    #[must_use]
    pub fn output_path(&self) -> &Utf8Path {
        self.output_path.as_path()
    }

    /// Renders `config` and atomically replaces the document.
    pub fn write(&self, config: &RuntimeConfig) -> Result<SynthesizedDocument, WriteError> {
        let contents = config.render();
        files::atomic_write(&self.output_path, contents.as_bytes())?;
        Ok(SynthesizedDocument {
            path: self.output_path.clone(),
            bytes: contents.len(),
            digest: hex_digest(contents.as_bytes()),
        })
    }
}

fn hex_digest(contents: &[u8]) -> String {
    Sha256::digest(contents)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
