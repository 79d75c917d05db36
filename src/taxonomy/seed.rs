//! Seed alias tables
//!
//! Seeds are hand-curated entity aliases that take precedence over names
//! discovered in the taxonomy source. They are passed to the index builder
//! explicitly, so alternate taxonomies and tests can supply their own.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::EntityAlias;

/// Ordered table of seed aliases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAliases {
    #[serde(rename = "alias", default)]
    aliases: Vec<EntityAlias>,
}

impl SeedAliases {
    /// Table with no seeds; the index is built from discovered names only
    pub fn empty() -> Self {
        Self {
            aliases: Vec::new(),
        }
    }

    /// Build a table from `(canonical, variations)` pairs
    pub fn from_pairs<I, S, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            aliases: pairs
                .into_iter()
                .map(|(canonical, variations)| EntityAlias {
                    canonical: canonical.into(),
                    variations: variations.into_iter().map(Into::into).collect(),
                })
                .collect(),
        }
    }

    /// Load a seed table from a TOML or JSON file
    ///
    /// TOML layout:
    ///
    /// ```toml
    /// [[alias]]
    /// canonical = "Apple Watch"
    /// variations = ["Apple Watch", "watchOS"]
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed alias file: {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let seeds: Self = if is_json {
            serde_json::from_str(&content).with_context(|| {
                format!("Failed to parse JSON seed alias file: {}", path.display())
            })?
        } else {
            toml::from_str(&content).with_context(|| {
                format!("Failed to parse TOML seed alias file: {}", path.display())
            })?
        };

        tracing::debug!(
            path = %path.display(),
            seeds = seeds.len(),
            "Loaded seed aliases"
        );

        Ok(seeds)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityAlias> {
        self.aliases.iter()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl Default for SeedAliases {
    /// Apple product families and the platform names filings use for them
    fn default() -> Self {
        Self::from_pairs([
            ("Mac", vec!["Mac", "macOS", "MacBook"]),
            ("iPhone", vec!["iPhone", "iOS"]),
            ("iPad", vec!["iPad", "iOS"]),
            ("Apple Watch", vec!["Apple Watch", "watchOS"]),
            ("Apple TV", vec!["Apple TV", "tvOS"]),
            ("Apple Pay", vec!["Apple Pay"]),
            ("iCloud", vec!["iCloud", "Cloud Computing"]),
        ])
    }
}
