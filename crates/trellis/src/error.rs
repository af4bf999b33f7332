//! Error types for Trellis operations.
//!
//! This module provides the main error type [`TrellisError`] which wraps
//! the error conditions that can occur while decoding a document.

use std::io;

use thiserror::Error;

use trellis_parser::error::Diagnostics;

/// The main error type for Trellis operations.
///
/// # Diagnostic Variants
///
/// The `Decode` variant keeps the diagnostics together with the source text
/// they point into, so callers can render snippets. It is empty when the
/// document did not come from text.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{diagnostics}")]
    Decode { diagnostics: Diagnostics, src: String },

    #[error("Projection error: {0}")]
    Projection(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TrellisError {
    /// Create a new `Decode` error with the associated source text.
    pub fn new_decode_error(diagnostics: Diagnostics, src: impl Into<String>) -> Self {
        Self::Decode {
            diagnostics,
            src: src.into(),
        }
    }

    /// Returns the diagnostics of a `Decode` error.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Decode { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}
