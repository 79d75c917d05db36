pub mod analyze;
pub mod mentions;
pub mod taxonomy;

// Re-export command functions for convenience
pub use analyze::{analyze, AnalyzeParams};
pub use mentions::{mentions, MentionsParams};
pub use taxonomy::taxonomy;

use anyhow::{Context, Result};
use std::path::Path;

use finmention::taxonomy::SeedAliases;

/// Seed aliases from `path`, or the built-in table
fn load_seeds(path: Option<&Path>) -> Result<SeedAliases> {
    match path {
        Some(path) => SeedAliases::from_file(path)
            .with_context(|| format!("Failed to load seed aliases from {}", path.display())),
        None => Ok(SeedAliases::default()),
    }
}
