//! Error taxonomy for the matching engine.
//!
//! [`FormatError`] is fatal at startup, [`DimensionError`] is fatal only for the vector it
//! touches, and [`ProviderError`] is always recovered by the orchestrator's fallbacks.
//! [`InitError`] wraps everything that can abort engine initialization.

use std::io;
use std::path::PathBuf;

/// Malformed weight binary.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("invalid model magic: expected \"GITA_MDL\", got {0:?}")]
    InvalidMagic(String),

    #[error("unsupported model version: {0} (expected 1)")]
    UnsupportedVersion(u32),

    #[error("weight stream truncated while reading {0}")]
    Truncated(&'static str),

    #[error("tensor {tensor} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        tensor: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("failed to read weight asset: {0}")]
    Io(#[from] io::Error),
}

/// Raw embedding width did not match the encoder input width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("embedding must be {expected}-dim, got {actual}")]
pub struct DimensionError {
    pub expected: usize,
    pub actual: usize,
}

/// Embedding or understanding provider failure. Never surfaced past the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,

    #[error("provider unreachable: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned an empty payload")]
    EmptyPayload,

    #[error("provider payload could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Corpus asset could not be read or parsed.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Engine initialization failure. Aborts initialization entirely.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("weight asset is malformed: {0}")]
    Format(#[from] FormatError),

    #[error("corpus assets unavailable: {0}")]
    Corpus(#[from] CorpusError),

    #[error("initialization task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for InitError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
