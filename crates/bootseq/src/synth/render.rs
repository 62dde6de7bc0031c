//! Serialises [`RuntimeConfig`] into the server's key/value section format.
//!
//! Sections and keys are emitted in a fixed order and nothing time- or
//! host-dependent is written, so the same input always renders the same bytes.

use std::fmt::Write as _;

use super::runtime_config::RuntimeConfig;

const HEADER: &str = "# Generated by bootseq on every boot. Edits are overwritten.\n";

struct Document {
    text: String,
}

impl Document {
    fn new() -> Self {
        Self {
            text: String::from(HEADER),
        }
    }

    fn section(&mut self, name: &str) -> &mut Self {
        // Writing into a String cannot fail.
        let _ = write!(self.text, "\n[{name}]\n");
        self
    }

    fn entry(&mut self, key: &str, value: impl std::fmt::Display) -> &mut Self {
        let _ = writeln!(self.text, "{key} = {value}");
        self
    }

    fn optional_entry(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.entry(key, value);
        }
        self
    }
}

impl RuntimeConfig {
    /// Renders the document the server reads on startup.
    #[must_use]
    pub fn render(&self) -> String {
        render(self)
    }
}

fn render(config: &RuntimeConfig) -> String {
    let mut document = Document::new();
    document
        .section("project")
        .entry("name", &config.project)
        .entry("collection", &config.collection)
        .entry("working_dir", &config.working_dir);
    document.section("storage").entry("provider", config.storage);
    document.section("vector").entry("provider", config.vector);
    document
        .section("llm")
        .entry("provider", config.llm.provider)
        .entry("host", &config.llm.host)
        .entry("model", &config.llm.model)
        .optional_entry("api_key", config.llm.api_key.as_deref());
    document
        .section("embedding")
        .entry("model", &config.embedding.model)
        .entry("dim", config.embedding.dim);

    if let Some(postgres) = &config.postgres {
        document
            .section("postgres")
            .entry("host", &postgres.host)
            .entry("port", postgres.port)
            .entry("database", &postgres.database)
            .entry("user", &postgres.user)
            .entry("password", &postgres.password);
    }
    if let Some(qdrant) = &config.qdrant {
        document
            .section("qdrant")
            .entry("url", &qdrant.url)
            .optional_entry("api_key", qdrant.api_key.as_deref());
    }
    if let Some(redis) = &config.redis {
        document
            .section("redis")
            .entry("uri", format_args!("redis://{}:{}", redis.host, redis.port));
    }
    document.text
}
