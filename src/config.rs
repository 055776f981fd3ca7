use std::env;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided or was empty.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
}

/// Default embedding model when `GOOGLE_EMBEDDING_MODEL` is not set.
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/gemini-embedding-001";
/// Default chat model when `GOOGLE_CHAT_MODEL` is not set.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

/// Runtime configuration for the docchat CLI.
///
/// Constructed once at process entry and passed by reference into the
/// pipelines; no ambient configuration state exists.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key used for both Gemini embeddings and chat completions.
    pub google_api_key: String,
    /// PostgreSQL connection string for the pgvector store.
    pub database_url: String,
    /// Name of the pgvector collection that holds document chunks.
    pub collection_name: String,
    /// Path to the PDF document read by the ingestion command.
    pub pdf_path: String,
    /// Embedding model identifier passed to Gemini.
    pub embedding_model: String,
    /// Chat model identifier passed to Gemini.
    pub chat_model: String,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            google_api_key: load_env("GOOGLE_API_KEY")?,
            database_url: load_env("DATABASE_URL")?,
            collection_name: load_env("PG_VECTOR_COLLECTION_NAME")?,
            pdf_path: load_env("PDF_PATH")?,
            embedding_model: load_env_optional("GOOGLE_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            chat_model: load_env_optional("GOOGLE_CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
