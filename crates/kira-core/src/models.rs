//! Core data models used throughout Kira.
//!
//! These types represent the loaded segments, chunks, search hits, and
//! conversation turns that flow through the ingestion and chat pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of a transcript turn or a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry of the displayed transcript. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A message sent to a language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Where a segment came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    /// Originating file path.
    pub source: String,
    /// Page, row, or sheet index within the source, depending on the loader.
    pub position: usize,
}

/// Raw text produced by a document loader before chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub metadata: SegmentMetadata,
}

impl Segment {
    pub fn new(text: impl Into<String>, source: impl Into<String>, position: usize) -> Self {
        Self {
            text: text.into(),
            metadata: SegmentMetadata {
                source: source.into(),
                position,
            },
        }
    }
}

/// A bounded window of a segment's text, ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Contiguous index across the whole document, starting at 0.
    pub chunk_index: usize,
    pub text: String,
    pub metadata: SegmentMetadata,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

/// A chunk returned from a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk_index: usize,
    pub text: String,
    pub source: String,
    pub position: usize,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}
