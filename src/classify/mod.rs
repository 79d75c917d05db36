//! Sentiment classification backends
//!
//! Every backend implements [`SentimentClassifier`]; callers hold an
//! `Arc<dyn SentimentClassifier>` and never branch on which one is in use.
//!
//! - [`local`] - pretrained BERT sequence classifier (FinBERT) run with Candle
//! - [`remote`] - structured-completion LLM service (OpenAI-compatible or Ollama)
//!
//! Only the populated fields of the returned [`ClassificationResult`] differ:
//! the local backend reports sentiment (with a confidence), the remote backend
//! reports sentiment, tone and style, emotion, intent and stance.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::models::{ClassificationResult, Mention, UnknownLabel};

pub use local::{FinBertClassifier, LocalModelConfig, TokenizerSource};
pub use remote::{RemoteClassifier, RemoteConfig, RemoteProtocol};

/// Result type for classification operations
pub type ClassifyResult<T> = Result<T, ClassificationError>;

/// Errors that can occur while classifying one mention
#[derive(Error, Debug)]
pub enum ClassificationError {
    /// Context text is empty or whitespace
    #[error("Empty input text")]
    EmptyInput,

    /// Tokenizer rejected the input
    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    /// Model forward pass failed
    #[error("Model inference failed: {0}")]
    Inference(String),

    /// Backend produced a label outside the fixed vocabulary
    #[error("Unexpected label: {0}")]
    UnknownLabel(#[from] UnknownLabel),

    /// Call exceeded its time budget
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Service returned {status}: {body}")]
    Service { status: u16, body: String },

    /// Response is not a well-formed structured payload
    #[error("Malformed structured response: {reason}")]
    MalformedResponse { reason: String },

    /// Structured response lacks a required field
    #[error("Missing field '{0}' in structured response")]
    MissingField(&'static str),

    /// Structured response field has an invalid value
    #[error("Invalid value for '{field}': {value}")]
    InvalidField { field: &'static str, value: String },

    /// Backend could not run the request at all
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl ClassificationError {
    /// Whether retrying the same request may succeed
    ///
    /// Timeouts, connection failures, rate limiting and server errors are
    /// transient; malformed responses and bad input are not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Service { status, .. } => *status == 429 || *status >= 500,
            Self::EmptyInput
            | Self::Tokenization(_)
            | Self::Inference(_)
            | Self::UnknownLabel(_)
            | Self::MalformedResponse { .. }
            | Self::MissingField(_)
            | Self::InvalidField { .. }
            | Self::Unavailable(_) => false,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}

impl From<candle_core::Error> for ClassificationError {
    fn from(err: candle_core::Error) -> Self {
        Self::Inference(err.to_string())
    }
}

/// A sentiment/tone classification backend
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Short backend name for logs and reports
    fn name(&self) -> &str;

    /// Whether results carry tone and style, emotion, intent and stance
    fn extended_fields(&self) -> bool {
        false
    }

    /// Classify the context of one mention
    async fn classify(&self, mention: &Mention) -> ClassifyResult<ClassificationResult>;
}

/// Which backend a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local FinBERT model
    #[default]
    Local,
    /// Remote LLM service
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Construct the backend selected by `config.analysis.backend`
///
/// Loading the local model downloads and memory-maps weights, so it runs on
/// the blocking thread pool.
pub async fn build_classifier(config: &Config) -> anyhow::Result<Arc<dyn SentimentClassifier>> {
    match config.analysis.backend {
        BackendKind::Local => {
            let local_config = config.local.clone();
            let classifier =
                tokio::task::spawn_blocking(move || FinBertClassifier::from_pretrained(local_config))
                    .await??;
            Ok(Arc::new(classifier))
        }
        BackendKind::Remote => {
            let classifier = RemoteClassifier::with_config(config.remote.clone(), config.retry.clone())?;
            if !classifier.is_available().await {
                tracing::warn!(
                    endpoint = %config.remote.endpoint,
                    "Remote classification service did not answer the availability probe"
                );
            }
            Ok(Arc::new(classifier))
        }
    }
}
