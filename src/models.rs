// Core data structures for finmention

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical entity name with the surface forms that resolve to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAlias {
    /// Canonical name (unique key in the index)
    pub canonical: String,

    /// Surface forms in scan order; always contains the canonical name
    pub variations: Vec<String>,
}

impl EntityAlias {
    /// Entity whose only surface form is its canonical name
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            variations: vec![name.clone()],
            canonical: name,
        }
    }
}

/// Bounded slice of the document around a matched mention
///
/// All offsets count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    /// Window start (inclusive)
    pub start: usize,

    /// Window end (exclusive)
    pub end: usize,

    /// Start of the matched variation
    pub match_start: usize,

    /// End of the matched variation (exclusive)
    pub match_end: usize,

    /// Window text
    pub text: String,
}

impl ContextWindow {
    /// Window length in characters
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Length of the matched variation in characters
    pub fn match_len(&self) -> usize {
        self.match_end - self.match_start
    }
}

/// First mention of a canonical entity in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Canonical entity name
    pub entity: String,

    /// Variation that produced the match
    pub variation: String,

    /// Context surrounding the match
    pub window: ContextWindow,
}

impl Mention {
    /// Context text handed to the classifier
    pub fn context(&self) -> &str {
        &self.window.text
    }
}

/// A label outside the fixed vocabulary of one of the result fields
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {field} label: '{value}'")]
pub struct UnknownLabel {
    pub field: &'static str,
    pub value: String,
}

macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Field name used in structured responses
            pub const FIELD: &'static str = $field;

            /// Every label, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownLabel;

            /// Case-insensitive match against the label vocabulary
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|label| label.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| UnknownLabel {
                        field: $field,
                        value: trimmed.to_string(),
                    })
            }
        }
    };
}

label_enum!(
    /// Sentiment of a mention context
    Sentiment, "Sentiment" {
        Positive => "Positive",
        Negative => "Negative",
        Neutral => "Neutral",
    }
);

label_enum!(
    /// Register of the surrounding text
    ToneAndStyle, "ToneAndStyle" {
        Formal => "Formal",
        Cautious => "Cautious",
        Informative => "Informative",
    }
);

label_enum!(
    /// Emotion conveyed about the entity
    Emotion, "Emotion" {
        Confident => "Confident",
        Concern => "Concern",
        Neutral => "Neutral",
    }
);

label_enum!(
    /// Stance of the text toward the entity
    Stance, "Stance" {
        Agreement => "Agreement",
        Contradiction => "Contradiction",
        Neutrality => "Neutrality",
    }
);

/// Classification outcome for one mention
///
/// The local backend fills `sentiment` (and `confidence`); the remote backend
/// fills every judgment field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub sentiment: Sentiment,

    /// Probability of the chosen label, when the backend reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone_and_style: Option<ToneAndStyle>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,

    /// Free-text purpose of the passage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stance: Option<Stance>,
}

impl ClassificationResult {
    /// Sentiment-only result
    pub fn sentiment(sentiment: Sentiment) -> Self {
        Self {
            sentiment,
            confidence: None,
            tone_and_style: None,
            emotion: None,
            intent: None,
            stance: None,
        }
    }

    /// Attach a label probability
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Whether any field beyond sentiment is populated
    pub fn is_extended(&self) -> bool {
        self.tone_and_style.is_some()
            || self.emotion.is_some()
            || self.intent.is_some()
            || self.stance.is_some()
    }
}
