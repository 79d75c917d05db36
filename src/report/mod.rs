//! Report assembly
//!
//! Joins located mentions with their classification outcomes into an ordered
//! report. Ordering follows the synonym index, restricted to entities that
//! were mentioned, so two runs over the same input produce identical rows.

pub mod writer;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::classify::ClassifyResult;
use crate::locator::MentionSet;
use crate::models::ClassificationResult;
use crate::taxonomy::SynonymIndex;

pub use writer::ReportWriter;

/// Reason recorded when a mentioned entity has no outcome at all
pub const NO_OUTCOME_REASON: &str = "no classification produced";

/// Result of classifying one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    /// Backend produced a valid judgment
    Classified(ClassificationResult),

    /// Backend failed for this entity only
    Unclassified { reason: String },
}

impl Outcome {
    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            Self::Classified(result) => Some(result),
            Self::Unclassified { .. } => None,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, Self::Classified(_))
    }
}

/// One report row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Canonical entity name
    pub entity: String,

    /// Variation that matched in the document
    pub variation: String,

    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Table columns a backend fills in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportColumns {
    /// Sentiment only
    #[default]
    Sentiment,
    /// Sentiment, tone and style, emotion, intent and stance
    Extended,
}

impl ReportColumns {
    /// Columns for a backend, given whether it judges more than sentiment
    pub fn for_backend(extended_fields: bool) -> Self {
        if extended_fields {
            Self::Extended
        } else {
            Self::Sentiment
        }
    }
}

/// Final analysis report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Backend that produced the outcomes
    pub backend: String,

    /// Columns the backend fills in, independent of which rows succeeded
    #[serde(default)]
    pub columns: ReportColumns,

    pub generated_at: DateTime<Utc>,

    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up the row for a canonical entity
    pub fn row(&self, entity: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|row| row.entity == entity)
    }

    pub fn classified_count(&self) -> usize {
        self.rows.iter().filter(|row| row.outcome.is_classified()).count()
    }

    pub fn unclassified_count(&self) -> usize {
        self.len() - self.classified_count()
    }

    /// Whether the table carries tone, emotion, intent and stance columns
    pub fn has_extended_fields(&self) -> bool {
        self.columns == ReportColumns::Extended
            || self
                .rows
                .iter()
                .filter_map(|row| row.outcome.result())
                .any(ClassificationResult::is_extended)
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Markdown table
    #[default]
    Markdown,
    /// Pretty-printed JSON
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markdown => f.write_str("markdown"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Join mentions with classification outcomes
///
/// Rows follow `index` order restricted to entities present in `mentions`;
/// each entity appears at most once. Failed or missing outcomes become
/// [`Outcome::Unclassified`] rows and are logged.
pub fn assemble(
    index: &SynonymIndex,
    mentions: &MentionSet,
    mut outcomes: HashMap<String, ClassifyResult<ClassificationResult>>,
    backend: &str,
    columns: ReportColumns,
) -> Report {
    let rows = index
        .canonical_names()
        .filter_map(|entity| mentions.get(entity))
        .map(|mention| {
            let outcome = match outcomes.remove(&mention.entity) {
                Some(Ok(result)) => Outcome::Classified(result),
                Some(Err(e)) => {
                    tracing::warn!(
                        entity = %mention.entity,
                        error = %e,
                        "Entity left unclassified"
                    );
                    Outcome::Unclassified {
                        reason: e.to_string(),
                    }
                }
                None => {
                    tracing::warn!(entity = %mention.entity, "No classification outcome for entity");
                    Outcome::Unclassified {
                        reason: NO_OUTCOME_REASON.to_string(),
                    }
                }
            };

            ReportRow {
                entity: mention.entity.clone(),
                variation: mention.variation.clone(),
                outcome,
            }
        })
        .collect();

    Report {
        backend: backend.to_string(),
        columns,
        generated_at: Utc::now(),
        rows,
    }
}
