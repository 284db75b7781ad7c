//! Error types for pesym.
//!
//! Decoding failures are structured with thiserror. The `Option`-returning
//! entry points in [`crate::api`] collapse these into an absent result; the
//! `try_*` variants hand them to the caller.

use thiserror::Error;

use crate::formats::pe::PeError;
use crate::io::error::IoError;

/// Why an image could not be analyzed.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The file could not be opened, read, or was over the size limit
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The bytes are not a decodable PE image
    #[error("Invalid PE image: {0}")]
    Format(#[from] PeError),
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Failure loading [`crate::config::AnalysisOptions`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
