//! Emotion-aware verse matching for free-text user statements.
//!
//! gita-match takes a sentence like "I feel anxious about my exams" and returns the single most
//! relevant verse from a small curated corpus, together with its linked story and a debug trace
//! of every decision made along the way. It ships as a library, a CLI, and an
//! [MCP](https://modelcontextprotocol.io/) server.
//!
//! | Stage | What happens |
//! |-------|--------------|
//! | **Embed** | The statement is embedded (1536 dims) by an OpenAI-compatible provider |
//! | **Detect** | The query is scored against 11 emotion labels with the same bi-encoder |
//! | **Paraphrase** | Optionally, a chat model restates the query closer to the corpus |
//! | **Rank** | Query projection is scored against every precomputed verse key |
//! | **Boost** | Verses tagged with the detected emotion get ×1.2, then re-sort |
//!
//! # Architecture
//!
//! - **Model**: a custom binary bi-encoder (`GITA_MDL` v1); linear query path, two-layer key
//!   path, both projecting into a shared 256-dim space
//! - **Corpus**: JSON verse, story, and embedding assets loaded once into memory
//! - **Providers**: async HTTP clients with retries; a missing key runs offline
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`corpus`] — Verse, story, and raw embedding assets
//! - [`embedding`] — Embedding and query-understanding providers
//! - [`engine`] — Once-only initialization and the `match` entry point
//! - [`error`] — Error taxonomy
//! - [`matching`] — Key index, emotion detector, ranking, and the request stage machine
//! - [`model`] — Binary weight format and bi-encoder inference

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod matching;
pub mod model;

pub use engine::GitaEngine;
pub use matching::{MatchOutcome, MatchResult, NoMatchReason};
