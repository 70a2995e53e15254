use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Extra time granted to HTTP clients beyond the upstream timeout, so the gateway's own deadline
/// always fires first.
const CLIENT_TIMEOUT_HEADROOM: Duration = Duration::from_secs(5);

/// Credential used when `API_KEY` is not provided. Deployments must override it.
pub const DEFAULT_API_KEY: &str = "change-me";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the gateway.
///
/// Built once at startup and passed to the service and router; request handlers never consult
/// the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Static credential callers must present in the `x-api-key` header.
    pub api_key: String,
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Bearer token for the OpenAI-compatible embeddings API.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible embeddings API.
    pub openai_base_url: String,
    /// Interface the HTTP server binds to.
    pub server_host: String,
    /// Port the HTTP server binds to.
    pub server_port: u16,
    /// Timeout applied to every call made to an external collaborator, in seconds.
    pub upstream_timeout_secs: u64,
    /// Largest `top_k` accepted by the search endpoint.
    pub search_max_top_k: usize,
    /// Maximum accepted body size for PDF uploads.
    pub max_upload_bytes: usize,
    /// `tracing` filter directive (`RUST_LOG`).
    pub log_filter: String,
    /// File receiving a copy of the logs; `logs/embedgate.log` when unset.
    pub log_file: Option<PathBuf>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// OpenAI-compatible embeddings API.
    OpenAI,
    /// Deterministic offline hashing encoder.
    Hash,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            qdrant_url: "http://127.0.0.1:6333".to_string(),
            qdrant_api_key: None,
            embedding_provider: EmbeddingProvider::Ollama,
            embedding_model: "all-minilm".to_string(),
            embedding_dimension: 384,
            ollama_url: "http://127.0.0.1:11434".to_string(),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            upstream_timeout_secs: 30,
            search_max_top_k: 100,
            max_upload_bytes: 20 * 1024 * 1024,
            log_filter: "info".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let embedding_provider = match load_env_optional("EMBEDDING_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            None => defaults.embedding_provider,
        };
        let openai_api_key = load_env_optional("OPENAI_API_KEY");
        if embedding_provider == EmbeddingProvider::OpenAI && openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".to_string()));
        }

        let config = Self {
            api_key: load_env_optional("API_KEY").unwrap_or(defaults.api_key),
            qdrant_url: load_env_optional("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_provider,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            embedding_dimension: parse_env("EMBEDDING_DIMENSION")?
                .unwrap_or(defaults.embedding_dimension),
            ollama_url: load_env_optional("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            openai_api_key,
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or(defaults.openai_base_url),
            server_host: load_env_optional("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_env("SERVER_PORT")?.unwrap_or(defaults.server_port),
            upstream_timeout_secs: parse_env("UPSTREAM_TIMEOUT_SECS")?
                .unwrap_or(defaults.upstream_timeout_secs),
            search_max_top_k: parse_env("SEARCH_MAX_TOP_K")?.unwrap_or(defaults.search_max_top_k),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes),
            log_filter: load_env_optional("RUST_LOG").unwrap_or(defaults.log_filter),
            log_file: load_env_optional("EMBEDGATE_LOG_FILE").map(PathBuf::from),
        };

        if config.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()));
        }
        if config.search_max_top_k == 0 {
            return Err(ConfigError::InvalidValue("SEARCH_MAX_TOP_K".to_string()));
        }

        Ok(config)
    }

    /// Timeout applied to each call to the embedding provider, vector store, or PDF converter.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }

    /// Timeout configured on the HTTP clients of the collaborators.
    ///
    /// Longer than [`Config::upstream_timeout`], so a slow collaborator is always reported as a
    /// gateway timeout rather than a transport error.
    pub fn client_timeout(&self) -> Duration {
        self.upstream_timeout() + CLIENT_TIMEOUT_HEADROOM
    }

    /// Log the effective settings. Call once tracing is installed.
    pub fn log_startup(&self) {
        tracing::debug!(
            qdrant_url = %self.qdrant_url,
            embedding_provider = ?self.embedding_provider,
            embedding_model = %self.embedding_model,
            embedding_dimension = self.embedding_dimension,
            upstream_timeout_secs = self.upstream_timeout_secs,
            "Loaded configuration"
        );
        if self.uses_default_api_key() {
            tracing::warn!("API_KEY is not set; the built-in default credential is in effect");
        }
    }

    /// Whether the process still runs with the built-in credential.
    pub fn uses_default_api_key(&self) -> bool {
        self.api_key == DEFAULT_API_KEY
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

/// Load configuration from `.env` and the process environment.
pub fn init_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    Config::from_env()
}
