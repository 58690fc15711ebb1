//! Error types for the assistant pipeline.
//!
//! [`LoadError`] covers document loading; [`KiraError`] is what session
//! operations return and what the HTTP layer maps to status codes.
//! Internals that talk to external services use `anyhow` and are wrapped
//! at this boundary.

use uuid::Uuid;

/// Errors from turning an uploaded file into text segments.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unsupported document format: {0}")]
    Unsupported(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {kind} document: {message}")]
    Parse { kind: &'static str, message: String },
    #[error("document contains no text: {0}")]
    Empty(String),
}

impl LoadError {
    pub(crate) fn parse(kind: &'static str, err: impl std::fmt::Display) -> Self {
        LoadError::Parse {
            kind,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KiraError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("upload rejected: {0}")]
    Upload(String),
    #[error("upload exceeds the {0}-byte limit")]
    UploadTooLarge(usize),
    #[error("language model error: {0}")]
    Llm(String),
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type KiraResult<T> = std::result::Result<T, KiraError>;
