//! Mention location and context extraction
//!
//! For every entity in a [`SynonymIndex`], finds its first whole-word,
//! case-insensitive occurrence in a [`DocumentText`] and slices a bounded
//! [`ContextWindow`] around it.
//!
//! The first occurrence is the minimal [`MentionCandidate`] under the ordering
//! `(variation_rank, start)`: earlier variations beat later ones regardless
//! of where they appear, and within one variation the leftmost match wins.

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

use crate::document::DocumentText;
use crate::models::{ContextWindow, EntityAlias, Mention};
use crate::taxonomy::SynonymIndex;

/// Default context radius in characters
pub const DEFAULT_WINDOW: usize = 500;

/// One occurrence of one variation of an entity
///
/// Field order defines the ordering: variation rank first, then byte position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MentionCandidate {
    /// Position of the variation in the entity's variation list
    pub variation_rank: usize,

    /// Byte offset of the match start
    pub start: usize,

    /// Byte offset of the match end
    pub end: usize,
}

/// Mentions found in one document, in synonym index order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionSet {
    mentions: Vec<Mention>,
}

impl MentionSet {
    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mention> {
        self.mentions.iter()
    }

    /// Mention for a canonical entity name
    pub fn get(&self, entity: &str) -> Option<&Mention> {
        self.mentions.iter().find(|m| m.entity == entity)
    }

    /// Canonical names of mentioned entities, in index order
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.mentions.iter().map(|m| m.entity.as_str())
    }
}

impl IntoIterator for MentionSet {
    type Item = Mention;
    type IntoIter = std::vec::IntoIter<Mention>;

    fn into_iter(self) -> Self::IntoIter {
        self.mentions.into_iter()
    }
}

impl<'a> IntoIterator for &'a MentionSet {
    type Item = &'a Mention;
    type IntoIter = std::slice::Iter<'a, Mention>;

    fn into_iter(self) -> Self::IntoIter {
        self.mentions.iter()
    }
}

impl FromIterator<Mention> for MentionSet {
    fn from_iter<I: IntoIterator<Item = Mention>>(iter: I) -> Self {
        Self {
            mentions: iter.into_iter().collect(),
        }
    }
}

/// Scans documents for entity mentions
///
/// Compiled patterns are cached per variation, so variations shared between
/// runs over several documents are compiled once.
#[derive(Debug)]
pub struct MentionLocator {
    /// Context radius in characters
    window: usize,

    /// Variation -> whole-word, case-insensitive pattern
    patterns: HashMap<String, Regex>,
}

impl MentionLocator {
    /// Create a locator with the given context radius
    pub fn new(window: usize) -> Self {
        Self {
            window,
            patterns: HashMap::new(),
        }
    }

    /// Context radius in characters
    pub fn window(&self) -> usize {
        self.window
    }

    /// Locate the first mention of every indexed entity
    pub fn locate(&mut self, document: &DocumentText, index: &SynonymIndex) -> MentionSet {
        let mentions: MentionSet = index
            .iter()
            .filter_map(|alias| self.locate_entity(document, alias))
            .collect();

        tracing::info!(
            entities = index.len(),
            mentioned = mentions.len(),
            window = self.window,
            "Located entity mentions"
        );

        mentions
    }

    /// Locate the first mention of a single entity
    pub fn locate_entity(&mut self, document: &DocumentText, alias: &EntityAlias) -> Option<Mention> {
        let candidate = self.first_candidate(document, alias)?;
        let variation = alias.variations[candidate.variation_rank].clone();
        let window = context_window(document.as_str(), candidate.start, candidate.end, self.window);

        tracing::debug!(
            entity = %alias.canonical,
            variation = %variation,
            match_start = window.match_start,
            "Found mention"
        );

        Some(Mention {
            entity: alias.canonical.clone(),
            variation,
            window,
        })
    }

    /// Minimal candidate, scanning variations in order and stopping at the first hit
    ///
    /// Candidates are generated in ascending `(variation_rank, start)` order, so
    /// the first one produced is also the minimum of [`Self::candidates`].
    pub fn first_candidate(
        &mut self,
        document: &DocumentText,
        alias: &EntityAlias,
    ) -> Option<MentionCandidate> {
        let text = document.as_str();

        alias
            .variations
            .iter()
            .enumerate()
            .find_map(|(rank, variation)| {
                let m = self.pattern(variation)?.find(text)?;
                Some(MentionCandidate {
                    variation_rank: rank,
                    start: m.start(),
                    end: m.end(),
                })
            })
    }

    /// Every occurrence of every variation of an entity, unordered
    pub fn candidates(&mut self, document: &DocumentText, alias: &EntityAlias) -> Vec<MentionCandidate> {
        let text = document.as_str();
        let mut candidates = Vec::new();

        for (rank, variation) in alias.variations.iter().enumerate() {
            if let Some(pattern) = self.pattern(variation) {
                candidates.extend(pattern.find_iter(text).map(|m| MentionCandidate {
                    variation_rank: rank,
                    start: m.start(),
                    end: m.end(),
                }));
            }
        }

        candidates
    }

    /// Cached pattern for a variation; `None` for empty or uncompilable variations
    fn pattern(&mut self, variation: &str) -> Option<&Regex> {
        if variation.is_empty() {
            return None;
        }

        if !self.patterns.contains_key(variation) {
            match build_pattern(variation) {
                Ok(re) => {
                    self.patterns.insert(variation.to_string(), re);
                }
                Err(e) => {
                    tracing::warn!(variation = %variation, error = %e, "Skipping unmatchable variation");
                    return None;
                }
            }
        }

        self.patterns.get(variation)
    }
}

impl Default for MentionLocator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// Whole-word, case-insensitive pattern for a literal variation
fn build_pattern(variation: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(variation)))
        .case_insensitive(true)
        .build()
}

/// Locate the first mention of every indexed entity
///
/// Entities that never occur are absent from the result.
pub fn locate_mentions(document: &DocumentText, index: &SynonymIndex, window: usize) -> MentionSet {
    MentionLocator::new(window).locate(document, index)
}

/// Slice `[match_start - window, match_end + window]`, clipped to the text
///
/// `start` and `end` are byte offsets on character boundaries; `window` and
/// every offset in the returned [`ContextWindow`] count characters.
pub fn context_window(text: &str, start: usize, end: usize, window: usize) -> ContextWindow {
    let window_start = retreat_chars(text, start, window);
    let window_end = advance_chars(text, end, window);

    let char_start = text[..window_start].chars().count();
    let match_start = char_start + text[window_start..start].chars().count();
    let match_end = match_start + text[start..end].chars().count();
    let char_end = match_end + text[end..window_end].chars().count();

    ContextWindow {
        start: char_start,
        end: char_end,
        match_start,
        match_end,
        text: text[window_start..window_end].to_string(),
    }
}

/// Byte offset `n` characters before `pos`, or 0
fn retreat_chars(text: &str, pos: usize, n: usize) -> usize {
    if n == 0 {
        return pos;
    }
    text[..pos]
        .char_indices()
        .rev()
        .take(n)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(pos)
}

/// Byte offset `n` characters after `pos`, or the text length
fn advance_chars(text: &str, pos: usize, n: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| pos + i)
        .unwrap_or(text.len())
}
