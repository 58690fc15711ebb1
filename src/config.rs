//! TOML configuration.
//!
//! Every section is optional; missing values fall back to the defaults the
//! assistant ships with (256-character chunks, 20-character overlap, `k = 3`).
//! The OpenAI API key is never read from the file, only from the
//! `OPENAI_API_KEY` environment variable via [`require_api_key`].
//!
//! ```toml
//! [chunking]
//! chunk_size = 256
//! chunk_overlap = 20
//!
//! [retrieval]
//! k = 3
//! min_score = 0.2
//!
//! [llm]
//! model = "gpt-4o-mini"
//! temperature = 0.5
//!
//! [server]
//! bind = "127.0.0.1:8501"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use kira_core::chunk::ChunkParams;

use crate::prompts::DEFAULT_SYSTEM_PROMPT;

/// Environment variable holding the OpenAI credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Upper bound for `server.session_idle_secs` (one year).
pub const MAX_SESSION_IDLE_SECS: u64 = 365 * 24 * 3600;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set; export it before starting kira")]
    MissingApiKey,
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    256
}
fn default_chunk_overlap() -> usize {
    20
}

impl ChunkingConfig {
    pub fn params(&self) -> Result<ChunkParams> {
        ChunkParams::new(self.chunk_size, self.chunk_overlap)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the grounded call.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Hits scoring below this cosine similarity are discarded.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            min_score: default_min_score(),
        }
    }
}

fn default_k() -> usize {
    3
}
fn default_min_score() -> f32 {
    0.2
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            max_retries: default_embedding_retries(),
            timeout_secs: default_embedding_timeout(),
            base_url: default_base_url(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_retries() -> u32 {
    5
}
fn default_embedding_timeout() -> u64 {
    30
}
fn default_base_url() -> String {
    OPENAI_BASE_URL.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: default_temperature(),
            max_retries: default_llm_retries(),
            timeout_secs: default_llm_timeout(),
            base_url: default_base_url(),
        }
    }
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.5
}
fn default_llm_retries() -> u32 {
    3
}
fn default_llm_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AssistantConfig {
    /// Overrides the built-in onboarding instructions for new sessions.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl AssistantConfig {
    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadsConfig {
    #[serde(default = "default_uploads_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: default_uploads_dir(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("./uploads")
}
fn default_max_bytes() -> usize {
    20 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Sessions unused for this long are dropped. `0` keeps them until deleted.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}
fn default_session_idle_secs() -> u64 {
    3600
}

impl Config {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking
            .params()
            .map_err(|e| ConfigError::Invalid(format!("chunking: {}", e)))?;

        if self.retrieval.k == 0 {
            return Err(ConfigError::Invalid("retrieval.k must be >= 1".into()));
        }
        if !(-1.0..=1.0).contains(&self.retrieval.min_score) {
            return Err(ConfigError::Invalid(
                "retrieval.min_score must be in [-1.0, 1.0]".into(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "embedding.batch_size must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(
                "llm.temperature must be in [0.0, 2.0]".into(),
            ));
        }
        if self.uploads.max_bytes == 0 {
            return Err(ConfigError::Invalid("uploads.max_bytes must be > 0".into()));
        }
        if self.server.session_idle_secs > MAX_SESSION_IDLE_SECS {
            return Err(ConfigError::Invalid(
                "server.session_idle_secs must be at most one year".into(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate a configuration string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Read the OpenAI key from the environment.
pub fn require_api_key() -> Result<String, ConfigError> {
    resolve_api_key(std::env::var(API_KEY_ENV).ok())
}

/// Accept a present, non-blank key.
pub fn resolve_api_key(value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(ConfigError::MissingApiKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.chunking.chunk_size, 256);
        assert_eq!(config.chunking.chunk_overlap, 20);
        assert_eq!(config.retrieval.k, 3);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.llm.temperature, 0.5);
        assert_eq!(config.server.bind, "127.0.0.1:8501");
        assert_eq!(config.server.session_idle_secs, 3600);
        assert_eq!(config.assistant.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse_config(
            r#"
[chunking]
chunk_size = 1000

[retrieval]
k = 5
min_score = 0.0

[assistant]
system_prompt = "Eres un tutor de cálculo."
"#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 20);
        assert_eq!(config.retrieval.k, 5);
        assert_eq!(config.assistant.system_prompt(), "Eres un tutor de cálculo.");
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let err = parse_config("[chunking]\nchunk_size = 20\nchunk_overlap = 20\n").unwrap_err();
        assert!(err.to_string().contains("chunking"));
    }

    #[test]
    fn rejects_zero_k() {
        assert!(parse_config("[retrieval]\nk = 0\n").is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse_config("[retrieval]\nmin_score = 1.5\n").is_err());
        assert!(parse_config("[llm]\ntemperature = 3.0\n").is_err());
        assert!(parse_config("[embedding]\nbatch_size = 0\n").is_err());
        assert!(parse_config("[server]\nsession_idle_secs = 99999999999\n").is_err());
        assert!(parse_config("[server]\nsession_idle_secs = 0\n").is_ok());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/kira.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn api_key_must_be_present_and_non_blank() {
        assert!(matches!(resolve_api_key(None), Err(ConfigError::MissingApiKey)));
        assert!(matches!(
            resolve_api_key(Some("   ".into())),
            Err(ConfigError::MissingApiKey)
        ));
        assert_eq!(resolve_api_key(Some(" sk-test ".into())).unwrap(), "sk-test");
    }

    #[test]
    fn missing_key_message_names_the_variable() {
        assert!(ConfigError::MissingApiKey
            .to_string()
            .contains("OPENAI_API_KEY"));
    }
}
