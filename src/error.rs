//! # Error Types
//!
//! This module defines error types used throughout the label library.
//!
//! Font loading failures never show up here: a missing font degrades to the
//! built-in bitmap font (see [`crate::font::FontSet::load`]).

use thiserror::Error;

/// Main error type for label operations
#[derive(Debug, Error)]
pub enum LabelError {
    /// Missing buyer or item text; the job is rejected before layout
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Printer device could not be opened, configured or written
    #[error("Printer unavailable: {0}")]
    PrinterUnavailable(String),

    /// Illegal job sequencing, or the server could not run
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// Image processing error
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
