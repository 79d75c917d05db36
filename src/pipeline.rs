//! End-to-end analysis pipeline
//!
//! Inputs are loaded and mentions located synchronously; classification then
//! runs concurrently with a bounded number of calls in flight, each under its
//! own time budget. A failure or timeout affects only its own entity.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::classify::{ClassificationError, ClassifyResult, SentimentClassifier};
use crate::config::AnalysisConfig;
use crate::document::{extract_text, DocumentText};
use crate::error::Result;
use crate::locator::{locate_mentions, MentionSet};
use crate::models::ClassificationResult;
use crate::report::{assemble, Report, ReportColumns};
use crate::taxonomy::{build_synonym_index, load_taxonomy_rows, SeedAliases, SynonymIndex};

/// Tuning knobs for one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Context characters kept on each side of a match
    pub window: usize,

    /// Maximum number of classification calls in flight
    pub max_concurrent: usize,

    /// Time budget for one entity's classification
    pub call_timeout: Duration,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for AnalyzerOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            window: config.window,
            max_concurrent: config.max_concurrent.max(1),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
        }
    }
}

/// Result of a run
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// No entity was mentioned; nothing was classified
    NothingFound,

    /// At least one entity was mentioned
    Report(Report),
}

/// Document and synonym index for one run
#[derive(Debug, Clone)]
pub struct AnalysisInputs {
    pub document: DocumentText,
    pub index: SynonymIndex,
}

/// Read the document and build the synonym index
///
/// A missing document or taxonomy aborts the run before any work is done.
pub fn load_inputs(
    document_path: &Path,
    taxonomy_path: &Path,
    seeds: &SeedAliases,
) -> Result<AnalysisInputs> {
    let document = extract_text(document_path)?;
    let rows = load_taxonomy_rows(taxonomy_path)?;
    let index = build_synonym_index(seeds, rows.iter().map(Option::as_deref));

    tracing::info!(
        document_chars = document.char_len(),
        taxonomy_rows = rows.len(),
        entities = index.len(),
        "Inputs loaded"
    );

    Ok(AnalysisInputs { document, index })
}

/// Locates mentions and classifies them with a shared backend
pub struct Analyzer {
    classifier: Arc<dyn SentimentClassifier>,
    options: AnalyzerOptions,
}

impl Analyzer {
    pub fn new(classifier: Arc<dyn SentimentClassifier>, options: AnalyzerOptions) -> Self {
        Self {
            classifier,
            options,
        }
    }

    /// Locate the first mention of every entity in the index
    pub fn locate(&self, document: &DocumentText, index: &SynonymIndex) -> MentionSet {
        locate_mentions(document, index, self.options.window)
    }

    /// Classify every mention, keyed by canonical entity name
    ///
    /// Timeouts are reported as [`ClassificationError::Timeout`] for the
    /// affected entity.
    pub async fn classify_all(
        &self,
        mentions: &MentionSet,
    ) -> HashMap<String, ClassifyResult<ClassificationResult>> {
        let classifier = &self.classifier;
        let call_timeout = self.options.call_timeout;

        tracing::info!(
            mentions = mentions.len(),
            backend = classifier.name(),
            max_concurrent = self.options.max_concurrent,
            "Classifying mentions"
        );

        stream::iter(mentions.iter())
            .map(|mention| async move {
                tracing::debug!(
                    entity = %mention.entity,
                    variation = %mention.variation,
                    window_chars = mention.window.len(),
                    "Classifying mention"
                );

                let outcome =
                    match tokio::time::timeout(call_timeout, classifier.classify(mention)).await {
                        Ok(result) => result,
                        Err(_) => Err(ClassificationError::Timeout(call_timeout)),
                    };

                if let Ok(result) = &outcome {
                    tracing::debug!(
                        entity = %mention.entity,
                        sentiment = %result.sentiment,
                        "Mention classified"
                    );
                }

                (mention.entity.clone(), outcome)
            })
            .buffer_unordered(self.options.max_concurrent.max(1))
            .collect()
            .await
    }

    /// Locate, classify and assemble
    pub async fn run(&self, document: &DocumentText, index: &SynonymIndex) -> AnalysisOutcome {
        let mentions = self.locate(document, index);
        self.analyze(index, &mentions).await
    }

    /// Classify already located mentions and assemble the report
    pub async fn analyze(&self, index: &SynonymIndex, mentions: &MentionSet) -> AnalysisOutcome {
        if mentions.is_empty() {
            return AnalysisOutcome::NothingFound;
        }

        let outcomes = self.classify_all(mentions).await;
        let columns = ReportColumns::for_backend(self.classifier.extended_fields());
        let report = assemble(index, mentions, outcomes, self.classifier.name(), columns);

        tracing::info!(
            rows = report.len(),
            classified = report.classified_count(),
            unclassified = report.unclassified_count(),
            "Report assembled"
        );

        AnalysisOutcome::Report(report)
    }
}
