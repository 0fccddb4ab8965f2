/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for view compilation, caching and rendering.
//!
//! Only failures that abort an operation live here. Problems that the
//! compiler can recover from (a missing include, an unreadable parent view)
//! are recorded as [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during view operations.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The cache directory is unset or is not an existing directory.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The requested top-level view does not exist.
    #[error("View not found: \"{name}\" (looked for {})", .path.display())]
    NotFound { name: String, path: PathBuf },

    /// The requested view exists but could not be read.
    #[error("Could not read view \"{name}\": {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A custom directive was registered under an invalid name.
    #[error("Invalid directive \"{name}\": directive names may only contain alphanumeric characters")]
    Validation { name: String },

    /// The executor failed to run a compiled artifact.
    #[error("Execution error: {message}")]
    Execution { message: String },

    /// The configuration file could not be parsed.
    #[error("Failed to parse view configuration: {0}")]
    ConfigParse(String),

    /// I/O error (e.g., writing or deleting a cached artifact).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViewError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        ViewError::Configuration {
            message: message.into(),
        }
    }
}

/// Result type for view operations.
pub type ViewResult<T> = Result<T, ViewError>;
