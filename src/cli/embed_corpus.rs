//! CLI `embed-corpus` command: regenerate raw verse embeddings with the configured provider.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

use gita_match::config::GitaConfig;
use gita_match::corpus::assets::write_embeddings;
use gita_match::corpus::{AssetStore, DirectoryAssets};
use gita_match::embedding::{create_providers, UsageTracker};
use gita_match::model::check_input_dim;

/// Embed every verse and write the embeddings file.
pub async fn embed_corpus(config: &GitaConfig) -> Result<()> {
    let dir = config.resolved_assets_dir();
    let assets = DirectoryAssets::new(&dir, config.assets.clone());

    let usage = Arc::new(UsageTracker::new());
    let providers = create_providers(&config.provider, Arc::clone(&usage))
        .context("failed to create embedding provider")?;
    let provider = providers
        .embedding()
        .context("no embedding provider configured; set OPENAI_API_KEY")?;

    let corpus = assets.load_corpus().context("failed to load corpus")?;
    let verses: Vec<(String, String)> = corpus
        .entries()
        .map(|e| (e.id.clone(), e.embedding_text()))
        .filter(|(_, text)| !text.is_empty())
        .collect();

    let total = verses.len();
    if total == 0 {
        println!("No verses to embed.");
        return Ok(());
    }

    println!("Embedding {total} verses with model '{}'...", provider.model());

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .context("invalid progress template")?
            .progress_chars("##-"),
    );

    let mut embedded = Vec::with_capacity(total);
    let mut failed = 0usize;
    for (id, text) in verses {
        match provider.embed(&text).await {
            Ok(vector) => match check_input_dim(&vector) {
                Ok(()) => embedded.push((id, vector)),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "provider returned wrong width");
                    failed += 1;
                }
            },
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "embedding failed");
                failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();

    anyhow::ensure!(!embedded.is_empty(), "every embedding request failed; nothing written");

    let path = assets.embeddings_path();
    write_embeddings(&path, provider.model(), embedded[0].1.len(), &embedded)
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!(
        "Embedded {} verses ({failed} failed) into {}.",
        embedded.len(),
        path.display()
    );
    println!("Estimated API cost: ${:.6}", usage.total_cost_usd());
    Ok(())
}
