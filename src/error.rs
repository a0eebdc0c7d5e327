//! # Error Types
//!
//! This module defines error types used throughout the tankmeme library.

use thiserror::Error;

/// Main error type for tankmeme operations
#[derive(Debug, Error)]
pub enum MemeError {
    /// User-facing validation failure (nothing was attempted)
    #[error("{0}")]
    Validation(String),

    /// Remote image, template, or catalog could not be loaded
    #[error("Load error: {0}")]
    Load(String),

    /// Image bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Final raster could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// A composition is already rendering for this session
    #[error("A meme is already being generated")]
    Busy,

    /// The result belongs to a source that has since been replaced
    #[error("Image source changed while the request was in flight")]
    Stale,

    /// Missing session, template, result, or profile
    #[error("Not found: {0}")]
    NotFound(String),

    /// Profile store failure
    #[error("Profile store error: {0}")]
    Profile(String),

    /// HTTP client error wrapper
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MemeError {
    /// Shorthand for a validation error with a user-facing message.
    pub fn validation(msg: impl Into<String>) -> Self {
        MemeError::Validation(msg.into())
    }
}
