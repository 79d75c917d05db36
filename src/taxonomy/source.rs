//! Taxonomy source loading
//!
//! Reads the `technologies` column of a taxonomy CSV export. Each cell holds
//! a `;`-delimited list of entity names.

use std::path::Path;

use crate::error::{Error, Result};

/// Column holding the `;`-delimited entity names
pub const TECHNOLOGIES_COLUMN: &str = "technologies";

/// Load raw taxonomy rows from a CSV file
///
/// Returns one element per data row; empty cells and short rows become `None`.
///
/// # Errors
///
/// - [`Error::InputNotFound`] if the file does not exist
/// - [`Error::Taxonomy`] if the header has no `technologies` column
/// - [`Error::Csv`] if the file is not readable as CSV
pub fn load_taxonomy_rows(path: &Path) -> Result<Vec<Option<String>>> {
    if !path.exists() {
        return Err(Error::not_found("Taxonomy", path));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(TECHNOLOGIES_COLUMN))
        .ok_or_else(|| {
            Error::Taxonomy(format!(
                "column '{TECHNOLOGIES_COLUMN}' not found in {}",
                path.display()
            ))
        })?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                let cell = record
                    .get(column)
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string);
                rows.push(cell);
            }
            Err(e) => {
                tracing::warn!(row = idx + 1, error = %e, "Skipping unreadable taxonomy row");
                rows.push(None);
            }
        }
    }

    tracing::info!(
        path = %path.display(),
        rows = rows.len(),
        "Loaded taxonomy rows"
    );

    Ok(rows)
}
