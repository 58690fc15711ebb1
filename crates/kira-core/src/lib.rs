//! # Kira Core
//!
//! I/O-free logic shared by the Kira assistant: data models, the recursive
//! character chunker, the [`embedding::Embedder`] and [`llm::LanguageModel`]
//! traits, the in-memory vector index, conversation memory, and prompt
//! construction.
//!
//! This crate performs no network or filesystem access. Concrete providers
//! (OpenAI embeddings and chat completions) and document loaders live in the
//! `kira` app crate.

pub mod chunk;
pub mod embedding;
pub mod index;
pub mod llm;
pub mod memory;
pub mod models;
pub mod prompt;
