use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Clausewise service.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Primary cosine-similarity threshold applied to retrieved clauses.
    pub similarity_primary: f32,
    /// Relaxed threshold used when nothing clears the primary one.
    pub similarity_fallback: f32,
    /// Minimum character length for an accepted clause.
    pub min_clause_length: usize,
    /// Hard cap on clauses accepted per document.
    pub max_clauses: usize,
    /// Number of top-ranked clauses retrieved per query.
    pub top_k_clauses: usize,
    /// Default payout amount granted on approval.
    pub default_coverage: u64,
    /// Policy duration (months) required before maternity coverage applies.
    pub maternity_waiting_months: u32,
    /// Dimensionality of the produced embedding vectors.
    pub embedding_dimension: usize,
    /// Maximum number of documents whose embeddings stay cached.
    pub embedding_cache_capacity: usize,
    /// Maximum number of cached (text, language) translations.
    pub translation_cache_capacity: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Base URL of a LibreTranslate-compatible translation service.
    pub translator_url: Option<String>,
    /// Base URL of the Ollama runtime used for generative entity extraction.
    pub ollama_url: Option<String>,
    /// Model identifier passed to the generative provider.
    pub generative_model: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            similarity_primary: load_env_parsed("SIMILARITY_PRIMARY", 0.5)?,
            similarity_fallback: load_env_parsed("SIMILARITY_FALLBACK", 0.3)?,
            min_clause_length: load_env_parsed("MIN_CLAUSE_LENGTH", 20)?,
            max_clauses: load_env_parsed("MAX_CLAUSES", 1000)?,
            top_k_clauses: load_env_parsed("TOP_K_CLAUSES", 3)?,
            default_coverage: load_env_parsed("DEFAULT_COVERAGE", 500_000)?,
            maternity_waiting_months: load_env_parsed("MATERNITY_WAITING_MONTHS", 9)?,
            embedding_dimension: load_env_parsed("EMBEDDING_DIMENSION", 384)?,
            embedding_cache_capacity: load_env_parsed("EMBEDDING_CACHE_CAPACITY", 64)?,
            translation_cache_capacity: load_env_parsed("TRANSLATION_CACHE_CAPACITY", 4096)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            translator_url: load_env_optional("TRANSLATOR_URL"),
            ollama_url: load_env_optional("OLLAMA_URL"),
            generative_model: load_env_optional("GENERATIVE_MODEL"),
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    CONFIG.get_or_init(|| {
        dotenvy::dotenv().ok();
        let config = Config::from_env().expect("Failed to load config from environment");
        tracing::debug!(
            similarity_primary = config.similarity_primary,
            similarity_fallback = config.similarity_fallback,
            top_k = config.top_k_clauses,
            embedding_dimension = config.embedding_dimension,
            server_port = ?config.server_port,
            "Loaded configuration"
        );
        config
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_rule_set() {
        let config = Config::from_env().expect("defaults load");
        assert!((config.similarity_primary - 0.5).abs() < f32::EPSILON);
        assert!((config.similarity_fallback - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.min_clause_length, 20);
        assert_eq!(config.max_clauses, 1000);
        assert_eq!(config.top_k_clauses, 3);
        assert_eq!(config.default_coverage, 500_000);
        assert_eq!(config.maternity_waiting_months, 9);
    }
}
