//! Unified error handling for the finmention crate
//!
//! Domain errors are collected into a single [`Error`] enum so the binary can
//! decide, in one place, which failures abort a run and which only degrade it.
//!
//! # Architecture
//!
//! - [`FinmentionErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use finmention::error::{Error, FinmentionErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Skipping entity: {err}");
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use crate::classify::ClassificationError;

/// Common trait for all finmention error types
pub trait FinmentionErrorTrait: std::error::Error {
    /// Check if this error is recoverable (retry, or degrade a single entity)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A required input file is missing
    Input,
    /// Taxonomy loading and parsing errors
    Taxonomy,
    /// Document text extraction errors
    Document,
    /// Sentiment backend errors (local model or remote service)
    Classification,
    /// Report rendering and writing errors
    Output,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    /// Short human-readable name for the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Taxonomy => "taxonomy",
            Self::Document => "document",
            Self::Classification => "classification",
            Self::Output => "output",
            Self::Config => "config",
        }
    }
}

/// Unified error type for the finmention crate
#[derive(Error, Debug)]
pub enum Error {
    /// Document or taxonomy source does not exist
    #[error("{kind} file not found: {}", path.display())]
    InputNotFound { kind: &'static str, path: PathBuf },

    /// Taxonomy source is present but unusable
    #[error("Taxonomy error: {0}")]
    Taxonomy(String),

    /// Text could not be extracted from the document
    #[error("Failed to extract text from {}: {reason}", path.display())]
    Document { path: PathBuf, reason: String },

    /// Sentiment backend errors
    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    /// CSV read errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Report template errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    /// Report rendering errors
    #[error("Render error: {0}")]
    Render(#[from] handlebars::RenderError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl FinmentionErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Classification(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::InputNotFound { .. }
            | Self::Taxonomy(_)
            | Self::Document { .. }
            | Self::Csv(_)
            | Self::Template(_)
            | Self::Render(_)
            | Self::Json(_)
            | Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InputNotFound { .. } => ErrorCategory::Input,
            Self::Taxonomy(_) | Self::Csv(_) => ErrorCategory::Taxonomy,
            Self::Document { .. } => ErrorCategory::Document,
            Self::Classification(_) => ErrorCategory::Classification,
            Self::Template(_) | Self::Render(_) | Self::Io(_) | Self::Json(_) => {
                ErrorCategory::Output
            }
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Create a missing-input error
    pub fn not_found(kind: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::InputNotFound {
            kind,
            path: path.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
