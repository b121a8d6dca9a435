//! # Error Types
//!
//! This module defines the error type used throughout the paper-trail crate.
//!
//! Image, transport and message errors are fatal to a single job; the worker
//! logs them and goes back to polling. Only [`PaperTrailError::Config`] ends
//! the process.

use thiserror::Error;

/// Main error type for paper-trail operations
#[derive(Debug, Error)]
pub enum PaperTrailError {
    /// Source image could not be read or decoded
    #[error("Image load error: {0}")]
    ImageLoad(String),

    /// Image decoded but cannot be expressed as a raster command
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Device could not be opened or configured
    #[error("Transport error: {0}")]
    Transport(String),

    /// Write or flush to the device failed
    #[error("Transport write error: {0}")]
    TransportWrite(String),

    /// Queue message body is not a JSON object
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Queue receive or delete failed
    #[error("Queue error: {0}")]
    Queue(String),

    /// Missing or invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for paper-trail operations
pub type Result<T> = std::result::Result<T, PaperTrailError>;
