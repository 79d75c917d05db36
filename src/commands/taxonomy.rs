use anyhow::{Context, Result};
use std::path::PathBuf;

use finmention::taxonomy::{build_synonym_index, load_taxonomy_rows};

use super::load_seeds;

/// Print the synonym index built from seeds and taxonomy rows as JSON
pub async fn taxonomy(taxonomy: PathBuf, seed_aliases: Option<PathBuf>) -> Result<()> {
    let seeds = load_seeds(seed_aliases.as_deref())?;
    let rows = load_taxonomy_rows(&taxonomy)?;
    let index = build_synonym_index(&seeds, rows.iter().map(Option::as_deref));

    tracing::info!(
        rows = rows.len(),
        seeds = seeds.len(),
        entities = index.len(),
        "Synonym index built"
    );

    let json = serde_json::to_string_pretty(&index).context("Failed to serialize synonym index")?;
    println!("{json}");

    Ok(())
}
