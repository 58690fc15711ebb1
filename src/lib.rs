//! # Kira
//!
//! A conversational study assistant for students of Universidad de La
//! Sabana. Users upload documents; the documents are split and embedded into
//! an in-memory similarity index, and questions are answered by combining a
//! retrieval-grounded answer with a memory-backed conversational one.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐
//! │  Loader  │──▶│ Chunker  │──▶│ Embedder │──▶│   Index   │
//! │ pdf/docx │   │ (core)   │   │ (OpenAI) │   │ (memory)  │
//! └──────────┘   └──────────┘   └──────────┘   └─────┬─────┘
//!                                                    │ retrieve
//!                  ┌──────────┐   ┌──────────┐       ▼
//!  chat ─────────▶ │ Session  │──▶│ Composer │──▶ grounded + conversational
//!                  └──────────┘   └──────────┘
//! ```
//!
//! The I/O-free pieces (chunker, vector math, index, memory, prompts) live
//! in the `kira-core` crate; this crate adds loaders, the OpenAI clients,
//! session management and the two front ends.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Typed errors |
//! | [`loader`] | Document loaders by extension |
//! | [`ingest`] | Upload persistence and index building |
//! | [`http`] | Retrying OpenAI HTTP client |
//! | [`embedding`] | OpenAI embedding provider |
//! | [`llm`] | OpenAI chat model |
//! | [`retrieval`] | Query-time retrieval |
//! | [`composer`] | Response composition |
//! | [`session`] | Per-session state and store |
//! | [`assistant`] | Operations shared by both front ends |
//! | [`server`] | HTTP JSON API |
//! | [`chat_cmd`] | Terminal chat |
//! | [`ingest_cmd`] | `kira ingest` |
//! | [`prompts`] | Built-in prompt and UI strings |

pub mod assistant;
pub mod chat_cmd;
pub mod composer;
pub mod config;
pub mod embedding;
pub mod error;
pub mod http;
pub mod ingest;
pub mod ingest_cmd;
pub mod llm;
pub mod loader;
pub mod prompts;
pub mod retrieval;
pub mod server;
pub mod session;
