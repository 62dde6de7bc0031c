//! Runtime configuration resolved from environment input.

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString, VariantNames};

use crate::env::EnvSource;

use super::errors::{MissingParameter, SynthesisError};

/// Primary metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StorageProvider {
    /// PostgreSQL key-value, document and status storage.
    Postgres,
    /// JSON files under the working directory.
    Json,
}

/// Vector index provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum VectorProvider {
    /// Qdrant collections.
    Qdrant,
    /// The PostgreSQL `vector` extension.
    Pgvector,
    /// Embedded file-backed index under the working directory.
    Nano,
}

/// Completions routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LlmProvider {
    /// An LLM proxy exposing the OpenAI API.
    Litellm,
    /// OpenAI directly.
    Openai,
    /// A local Ollama instance.
    Ollama,
}

impl LlmProvider {
    const fn default_host(self) -> &'static str {
        match self {
            Self::Litellm => "http://litellm:4000",
            Self::Openai => "https://api.openai.com/v1",
            Self::Ollama => "http://ollama:11434",
        }
    }

    const fn requires_api_key(self) -> bool {
        matches!(self, Self::Litellm | Self::Openai)
    }
}

/// Capability name under which vector-extension failures are signed.
pub const VECTOR_CAPABILITY: &str = "vector";

/// Connection parameters for PostgreSQL.
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresParams {
    /// Host name.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for PostgresParams {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PostgresParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection parameters for Qdrant.
#[derive(Clone, PartialEq, Eq)]
pub struct QdrantParams {
    /// Base URL.
    pub url: String,
    /// Optional API key.
    pub api_key: Option<String>,
}

impl fmt::Debug for QdrantParams {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("QdrantParams")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Completions endpoint parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct LlmParams {
    /// Selected provider.
    pub provider: LlmProvider,
    /// Endpoint base URL.
    pub host: String,
    /// Model name.
    pub model: String,
    /// API key, when the provider needs one.
    pub api_key: Option<String>,
}

impl fmt::Debug for LlmParams {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LlmParams")
            .field("provider", &self.provider)
            .field("host", &self.host)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Embedding model parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingParams {
    /// Model name.
    pub model: String,
    /// Vector dimension.
    pub dim: u32,
}

/// Optional cache layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisParams {
    /// Host name.
    pub host: String,
    /// Port.
    pub port: u16,
}

/// Structured document read by the server on startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Project namespace.
    pub project: String,
    /// Logical collection name.
    pub collection: String,
    /// Directory for file-backed providers.
    pub working_dir: String,
    /// Primary metadata store.
    pub storage: StorageProvider,
    /// Vector index provider.
    pub vector: VectorProvider,
    /// Completions endpoint.
    pub llm: LlmParams,
    /// Embedding model.
    pub embedding: EmbeddingParams,
    /// PostgreSQL parameters, present when a provider uses PostgreSQL.
    pub postgres: Option<PostgresParams>,
    /// Qdrant parameters, present when Qdrant is the vector provider.
    pub qdrant: Option<QdrantParams>,
    /// Cache parameters, present when `REDIS_HOST` is set.
    pub redis: Option<RedisParams>,
}

impl RuntimeConfig {
    /// Resolves the configuration, applying defaults and checking that each
    /// selected provider has every parameter it needs.
    ///
    /// Every missing parameter is reported at once, in a stable order.
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, SynthesisError> {
        let reader = Reader { env };
        let storage: StorageProvider = reader.choice("STORAGE_PROVIDER", StorageProvider::Postgres)?;
        let vector: VectorProvider = reader.choice("VECTOR_PROVIDER", VectorProvider::Qdrant)?;
        let llm_provider: LlmProvider = reader.choice("LLM_PROVIDER", LlmProvider::Litellm)?;

        let project = reader.text("PROJECT_NAME", "default")?;
        let collection = reader.text("COLLECTION_NAME", &project)?;
        let working_dir = reader.text("WORKING_DIR", "/app/data/rag_storage")?;

        let mut missing = Vec::new();

        let uses_postgres =
            storage == StorageProvider::Postgres || vector == VectorProvider::Pgvector;
        let postgres = if uses_postgres {
            let provider = if storage == StorageProvider::Postgres {
                format!("storage provider {storage}")
            } else {
                format!("vector provider {vector}")
            };
            let user = reader.required("POSTGRES_USER", &provider, &mut missing)?;
            let password = reader.required("POSTGRES_PASSWORD", &provider, &mut missing)?;
            Some(PostgresParams {
                host: reader.text("POSTGRES_HOST", "postgres")?,
                port: reader.number("POSTGRES_PORT", 5432)?,
                database: reader.text("POSTGRES_DATABASE", "rag")?,
                user: user.unwrap_or_default(),
                password: password.unwrap_or_default(),
            })
        } else {
            None
        };

        let qdrant = if vector == VectorProvider::Qdrant {
            Some(QdrantParams {
                url: reader.text("QDRANT_URL", "http://qdrant:6333")?,
                api_key: reader.optional("QDRANT_API_KEY")?,
            })
        } else {
            None
        };

        let llm_label = format!("llm provider {llm_provider}");
        let api_key = if llm_provider.requires_api_key() {
            reader.required("LLM_API_KEY", &llm_label, &mut missing)?
        } else {
            reader.optional("LLM_API_KEY")?
        };
        let llm = LlmParams {
            provider: llm_provider,
            host: reader.text("LLM_BINDING_HOST", llm_provider.default_host())?,
            model: reader.text("LLM_MODEL", "gpt-4o-mini")?,
            api_key,
        };

        let embedding = EmbeddingParams {
            model: reader.text("EMBEDDING_MODEL", "text-embedding-3-small")?,
            dim: reader.number("EMBEDDING_DIM", 1536)?,
        };

        let redis = match reader.optional("REDIS_HOST")? {
            Some(host) => Some(RedisParams {
                host,
                port: reader.number("REDIS_PORT", 6379)?,
            }),
            None => None,
        };

        if !missing.is_empty() {
            return Err(SynthesisError::MissingParameters { missing });
        }

        Ok(Self {
            project,
            collection,
            working_dir,
            storage,
            vector,
            llm,
            embedding,
            postgres,
            qdrant,
            redis,
        })
    }

    /// Provider that supplies `capability` independently of the primary
    /// store, if the configuration has one.
    ///
    /// Only the `vector` capability is known: it is supplied separately
    /// whenever the vector provider is not the PostgreSQL extension.
    #[must_use]
    pub fn fallback_for(&self, capability: &str) -> Option<String> {
        match capability {
            VECTOR_CAPABILITY if self.vector != VectorProvider::Pgvector => {
                Some(self.vector.to_string())
            }
            _ => None,
        }
    }
}

struct Reader<'a> {
    env: &'a dyn EnvSource,
}

impl Reader<'_> {
    fn optional(&self, variable: &str) -> Result<Option<String>, SynthesisError> {
        match self.env.value(variable) {
            Some(value) if value.contains(['\n', '\r']) => Err(SynthesisError::MultilineValue {
                variable: variable.to_owned(),
            }),
            other => Ok(other),
        }
    }

    fn text(&self, variable: &str, default: &str) -> Result<String, SynthesisError> {
        Ok(self
            .optional(variable)?
            .unwrap_or_else(|| default.to_owned()))
    }

    fn required(
        &self,
        variable: &str,
        provider: &str,
        missing: &mut Vec<MissingParameter>,
    ) -> Result<Option<String>, SynthesisError> {
        let value = self.optional(variable)?;
        if value.is_none() {
            missing.push(MissingParameter {
                variable: variable.to_owned(),
                required_by: provider.to_owned(),
            });
        }
        Ok(value)
    }

    fn number<N>(&self, variable: &str, default: N) -> Result<N, SynthesisError>
    where
        N: FromStr<Err = std::num::ParseIntError>,
    {
        match self.optional(variable)? {
            Some(value) => value
                .parse::<N>()
                .map_err(|source| SynthesisError::InvalidNumber {
                    variable: variable.to_owned(),
                    value,
                    source,
                }),
            None => Ok(default),
        }
    }

    fn choice<T>(&self, variable: &str, default: T) -> Result<T, SynthesisError>
    where
        T: FromStr + VariantNames,
    {
        match self.optional(variable)? {
            Some(value) => value
                .parse::<T>()
                .map_err(|_| SynthesisError::UnknownProvider {
                    variable: variable.to_owned(),
                    value,
                    expected: T::VARIANTS.join(", "),
                }),
            None => Ok(default),
        }
    }
}
