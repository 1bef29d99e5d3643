//! Error types
//!
//! `SearchError` is the crate-level error. Record-level parse problems are
//! counted by the loaders instead of being returned (see `LoadReport`).

use crate::domain::checkpoint_format::CheckpointFormatError;
use thiserror::Error;

/// Crate-level error
#[derive(Debug, Error)]
pub enum SearchError {
    /// Invalid configuration detected before any work starts
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed input record
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Input contained a byte outside ASCII
    #[error("invalid character {found:?} at byte {position}")]
    InvalidCharacter { position: usize, found: char },

    /// A shard failed while executing
    #[error("shard {shard} failed: {message}")]
    Worker { shard: u32, message: String },

    /// The requested hash backend could not be initialized
    #[error("acceleration unavailable: {0}")]
    AccelerationUnavailable(String),

    /// Checkpoint file could not be used
    #[error(transparent)]
    Checkpoint(#[from] CheckpointFormatError),

    /// JSON input could not be decoded
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = SearchError> = std::result::Result<T, E>;

/// Counts of records loaded and skipped by an input loader
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records accepted
    pub loaded: usize,
    /// Malformed records skipped
    pub skipped: usize,
}

impl LoadReport {
    /// Combine two reports
    pub fn merge(self, other: LoadReport) -> LoadReport {
        LoadReport {
            loaded: self.loaded + other.loaded,
            skipped: self.skipped + other.skipped,
        }
    }
}
