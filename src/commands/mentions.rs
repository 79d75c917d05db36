use anyhow::{Context, Result};
use std::path::PathBuf;

use finmention::locator::MentionLocator;
use finmention::pipeline::load_inputs;
use finmention::utils::preview;

use super::load_seeds;

/// Parameters for the mentions command
#[derive(Debug, Clone)]
pub struct MentionsParams {
    pub document: PathBuf,
    pub taxonomy: PathBuf,
    pub seed_aliases: Option<PathBuf>,
    pub window: usize,
    pub preview: usize,
}

/// Locate mentions without classifying them
pub async fn mentions(params: MentionsParams) -> Result<()> {
    let seeds = load_seeds(params.seed_aliases.as_deref())?;
    let document_path = params.document.clone();
    let taxonomy_path = params.taxonomy.clone();

    let inputs =
        tokio::task::spawn_blocking(move || load_inputs(&document_path, &taxonomy_path, &seeds))
            .await
            .context("Input loading task failed")??;

    let mut locator = MentionLocator::new(params.window);
    let mentions = locator.locate(&inputs.document, &inputs.index);

    if mentions.is_empty() {
        println!("No technologies found in the document.");
        return Ok(());
    }

    println!(
        "Found {} of {} technologies:\n",
        mentions.len(),
        inputs.index.len()
    );

    for (i, mention) in mentions.iter().enumerate() {
        println!(
            "{}. {} (matched \"{}\" at chars {}..{})",
            i + 1,
            mention.entity,
            mention.variation,
            mention.window.match_start,
            mention.window.match_end
        );
        println!("   {}", preview(mention.context(), params.preview));
    }

    Ok(())
}
