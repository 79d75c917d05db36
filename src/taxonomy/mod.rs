//! Taxonomy normalization and the synonym index
//!
//! Turns a seed alias table and noisy taxonomy rows into a [`SynonymIndex`]:
//! canonical entity name -> ordered, deduplicated surface forms.
//!
//! # Rules
//!
//! - Rows are `;`-delimited lists of names; missing or empty rows contribute nothing
//! - Every name is trimmed and stripped of non-word, non-space characters
//! - Seeds are inserted first and always win
//! - A variation belongs to exactly one canonical entry (case-insensitive)
//!
//! # Example
//!
//! ```
//! use finmention::taxonomy::{build_synonym_index, SeedAliases};
//!
//! let rows = [Some("Machine Learning; 5G;"), None, Some("iPhone")];
//! let index = build_synonym_index(&SeedAliases::default(), rows);
//!
//! assert!(index.get("5G").is_some());
//! // "iPhone" is already a seed, so it is not inserted twice
//! assert_eq!(index.get("iPhone").unwrap().variations, vec!["iPhone", "iOS"]);
//! ```

pub mod seed;
pub mod source;

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::models::EntityAlias;

pub use seed::SeedAliases;
pub use source::load_taxonomy_rows;

/// Strip punctuation noise from a raw entity name
///
/// Removes every character that is neither a word character nor whitespace,
/// then trims. Returns `None` if nothing is left.
pub fn normalize_entity_name(raw: &str) -> Option<String> {
    static NOISE_RE: OnceLock<Regex> = OnceLock::new();

    let re = NOISE_RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("Invalid regex pattern"));

    let normalized = re.replace_all(raw.trim(), "");
    let normalized = normalized.trim();

    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

/// Case-folded key used for uniqueness checks
fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// Canonical entity name -> surface forms, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymIndex {
    /// Entries in insertion order (seeds first)
    entries: Vec<EntityAlias>,

    /// Folded canonical name -> entry position
    by_canonical: HashMap<String, usize>,

    /// Folded variation -> owning entry position
    claimed: HashMap<String, usize>,
}

impl SynonymIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of canonical entities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &EntityAlias> {
        self.entries.iter()
    }

    /// Look up an entry by canonical name (case-insensitive)
    pub fn get(&self, canonical: &str) -> Option<&EntityAlias> {
        self.by_canonical
            .get(&fold(canonical))
            .map(|&idx| &self.entries[idx])
    }

    /// Entry that owns `name` as canonical key or variation (case-insensitive)
    pub fn resolve(&self, name: &str) -> Option<&EntityAlias> {
        self.claimed.get(&fold(name)).map(|&idx| &self.entries[idx])
    }

    /// Whether `name` is already a canonical key or a variation
    pub fn contains_name(&self, name: &str) -> bool {
        self.claimed.contains_key(&fold(name))
    }

    /// Canonical names in insertion order
    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.canonical.as_str())
    }

    /// Insert a seed entry
    ///
    /// The canonical name and variations are normalized; the canonical name is
    /// prepended if the seed omits it. Variations already owned by an earlier
    /// entry are dropped. Returns `false` if the canonical name itself is
    /// already claimed or normalizes to nothing.
    pub fn insert_seed(&mut self, alias: &EntityAlias) -> bool {
        let Some(canonical) = normalize_entity_name(&alias.canonical) else {
            tracing::warn!(canonical = %alias.canonical, "Skipping seed with empty canonical name");
            return false;
        };

        if self.contains_name(&canonical) {
            tracing::warn!(
                canonical = %canonical,
                "Skipping seed whose canonical name is already indexed"
            );
            return false;
        }

        let mut variations: Vec<String> = Vec::with_capacity(alias.variations.len() + 1);
        let mut seen: Vec<String> = Vec::with_capacity(alias.variations.len() + 1);

        let normalized = alias
            .variations
            .iter()
            .filter_map(|v| normalize_entity_name(v));

        let has_canonical = alias
            .variations
            .iter()
            .filter_map(|v| normalize_entity_name(v))
            .any(|v| fold(&v) == fold(&canonical));

        let leading = (!has_canonical).then(|| canonical.clone());

        for variation in leading.into_iter().chain(normalized) {
            let key = fold(&variation);
            if seen.contains(&key) {
                continue;
            }
            if let Some(&owner) = self.claimed.get(&key) {
                tracing::debug!(
                    canonical = %canonical,
                    variation = %variation,
                    owner = %self.entries[owner].canonical,
                    "Dropping seed variation claimed by an earlier entry"
                );
                continue;
            }
            seen.push(key);
            variations.push(variation);
        }

        self.push_entry(EntityAlias {
            canonical,
            variations,
        });
        true
    }

    /// Insert a discovered taxonomy name as its own single-variation entry
    ///
    /// Returns `false` if the name is already a canonical key or a variation.
    pub fn insert_discovered(&mut self, name: &str) -> bool {
        if name.is_empty() || self.contains_name(name) {
            return false;
        }

        self.push_entry(EntityAlias::single(name));
        true
    }

    fn push_entry(&mut self, alias: EntityAlias) {
        let idx = self.entries.len();
        self.by_canonical.insert(fold(&alias.canonical), idx);
        for variation in &alias.variations {
            self.claimed.insert(fold(variation), idx);
        }
        self.entries.push(alias);
    }
}

impl Serialize for SynonymIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.canonical, &entry.variations)?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a SynonymIndex {
    type Item = &'a EntityAlias;
    type IntoIter = std::slice::Iter<'a, EntityAlias>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Build the synonym index from seeds and raw taxonomy rows
///
/// Rows are `;`-delimited lists; `None` stands for a missing cell. Malformed
/// rows never fail the build, they simply contribute nothing.
pub fn build_synonym_index<'a, I>(seeds: &SeedAliases, rows: I) -> SynonymIndex
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut index = SynonymIndex::new();

    for alias in seeds.iter() {
        index.insert_seed(alias);
    }
    let seeded = index.len();

    for row in rows.into_iter().flatten() {
        for name in row.split(';').filter_map(normalize_entity_name) {
            index.insert_discovered(&name);
        }
    }

    tracing::debug!(
        seeded = seeded,
        discovered = index.len() - seeded,
        "Built synonym index"
    );

    index
}
