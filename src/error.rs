//! Error types for qingting-dl
//!
//! This module provides error handling for the library, including:
//! - Run-level failures (missing session, token exchange, enumeration)
//! - Per-episode failures (edition resolution, file saving)
//! - Machine-readable error codes for consumers that forward errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for qingting-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for qingting-dl
///
/// Precondition, token exchange and enumeration failures abort a whole run and end up
/// in [`DownloadState::error`](crate::types::DownloadState::error). Everything raised
/// while processing a single episode is recorded on that episode instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A required piece of page context is missing (session cookie, refresh token)
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The remote API answered with a non-zero `errorno` or an unexpected body shape
    #[error("API error from {endpoint}: {message}")]
    Api {
        /// Endpoint URL that produced the error
        endpoint: String,
        /// Message reported by the API (`errormsg`) or a decode failure description
        message: String,
    },

    /// Network error (connection failure, timeout, non-success HTTP status)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The page URL could not be parsed into channel/program identifiers
    #[error("failed to parse page URL: {0}")]
    Parse(String),

    /// The audiostream endpoint returned no usable edition
    #[error("no streamable edition available for program {program_id}")]
    NoEditions {
        /// Program whose edition list was empty
        program_id: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Output file already exists and the collision action forbids replacing it
    #[error("file collision at {}", path.display())]
    FileCollision {
        /// The path where the collision occurred
        path: PathBuf,
    },

    /// The run was cancelled before this operation finished
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Build an [`Error::Api`] for the given endpoint
    pub fn api(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Precondition(_) => "precondition_failed",
            Error::Api { .. } => "api_error",
            Error::Network(_) => "network_error",
            Error::Parse(_) => "parse_error",
            Error::NoEditions { .. } => "no_editions",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::FileCollision { .. } => "file_collision",
            Error::Cancelled => "cancelled",
        }
    }

    /// Whether this error aborts a whole run when raised during setup
    ///
    /// Per-episode code never propagates errors upward, so this only matters for
    /// consumers deciding how to present a failure.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::Precondition(_) | Error::Parse(_))
    }
}
