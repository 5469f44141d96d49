//! Error types for terrain streaming

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("view distance must be >= 0, got {0}")]
    InvalidViewDistance(i32),

    #[error("material index {index} out of range (max {max})")]
    MaterialIndex { index: usize, max: usize },

    #[error("block size power {0} out of range (expected 1..=8)")]
    InvalidBlockSize(u32),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("worker error: {0}")]
    Worker(String),
}
