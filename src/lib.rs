//! finmention - technology mention sentiment for financial filings
//!
//! Finds the first mention of each technology from a controlled vocabulary in
//! a long financial document, cuts a bounded context window around it, and
//! classifies the sentiment and tone of that context with a local model or a
//! remote LLM service.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`taxonomy`] - Synonym index built from seed aliases and taxonomy rows
//! - [`document`] - Document text extraction and normalization
//! - [`locator`] - First-mention search and context windows
//! - [`classify`] - Sentiment backends behind one trait
//! - [`report`] - Report assembly and rendering
//! - [`pipeline`] - End-to-end run with bounded concurrency
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use finmention::classify::build_classifier;
//! use finmention::config::Config;
//! use finmention::pipeline::{load_inputs, AnalysisOutcome, Analyzer, AnalyzerOptions};
//! use finmention::taxonomy::SeedAliases;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let inputs = load_inputs(
//!         Path::new("10q.pdf"),
//!         Path::new("taxonomy.csv"),
//!         &SeedAliases::default(),
//!     )?;
//!
//!     let classifier = build_classifier(&config).await?;
//!     let analyzer = Analyzer::new(classifier, AnalyzerOptions::from(&config.analysis));
//!
//!     if let AnalysisOutcome::Report(report) = analyzer.run(&inputs.document, &inputs.index).await {
//!         println!("{} rows", report.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod locator;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod taxonomy;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::classify::{build_classifier, BackendKind, ClassificationError, SentimentClassifier};
    pub use crate::config::Config;
    pub use crate::document::DocumentText;
    pub use crate::error::{Error, ErrorCategory, FinmentionErrorTrait, Result};
    pub use crate::locator::{locate_mentions, MentionLocator, MentionSet};
    pub use crate::models::{ClassificationResult, ContextWindow, EntityAlias, Mention, Sentiment};
    pub use crate::pipeline::{AnalysisOutcome, Analyzer, AnalyzerOptions};
    pub use crate::report::{Outcome, Report, ReportColumns, ReportFormat, ReportWriter};
    pub use crate::taxonomy::{build_synonym_index, SeedAliases, SynonymIndex};
}

// Direct re-exports for convenience
pub use models::{ClassificationResult, EntityAlias, Mention};
