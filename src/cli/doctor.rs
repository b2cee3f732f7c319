//! CLI `doctor` command: inspect the asset directory and print a health report.

use anyhow::Result;

use gita_match::config::GitaConfig;
use gita_match::corpus::{AssetStore, DirectoryAssets, EmotionCategory};
use gita_match::matching::{KeyIndex, SkipReason};
use gita_match::model::{BiEncoder, INPUT_DIM};

/// Load every asset the engine would load and report what is missing or unusable.
pub fn doctor(config: &GitaConfig) -> Result<()> {
    let dir = config.resolved_assets_dir();
    let assets = DirectoryAssets::new(&dir, config.assets.clone());

    println!("gita-match Health Report");
    println!("========================");
    println!();
    println!("Assets:            {}", dir.display());
    if !dir.exists() {
        println!("  WARNING: directory does not exist.");
        println!("  Set assets.dir in ~/.gita/config.toml or GITA_ASSETS.");
        return Ok(());
    }

    println!();
    println!("Model weights:     {}", assets.weights_path().display());
    let encoder = match assets.load_weights() {
        Ok(weights) => {
            println!("  query_proj:      {:?}", weights.query_proj.dim());
            println!(
                "  key_fc1:         {:?} + {}",
                weights.key_fc1_weight.dim(),
                weights.key_fc1_bias.len()
            );
            println!(
                "  key_fc2:         {:?} + {}",
                weights.key_fc2_weight.dim(),
                weights.key_fc2_bias.len()
            );
            println!("  Parameters:      {}", weights.parameter_count());
            Some(BiEncoder::new(weights))
        }
        Err(e) => {
            println!("  FAILED: {e}");
            None
        }
    };

    println!();
    let corpus = match assets.load_corpus() {
        Ok(corpus) => corpus,
        Err(e) => {
            println!("Corpus:            FAILED ({e})");
            return Ok(());
        }
    };
    let unlinked = corpus
        .entries()
        .filter(|e| e.narrative_key.is_some() && corpus.narrative_for(e).is_none())
        .count();
    println!("Corpus:");
    println!("  Verses:          {}", corpus.len());
    println!("  Stories:         {}", corpus.narrative_count());
    println!("  Broken links:    {unlinked}");
    println!("  Emotion tags:");
    for emotion in EmotionCategory::ALL {
        println!("    {:<20} {}", emotion.as_str(), corpus.tagged_count(emotion));
    }
    let untagged = corpus.entries().filter(|e| e.emotion.is_none()).count();
    println!("    {:<20} {untagged}", "(untagged)");

    println!();
    let embeddings = match assets.load_embeddings() {
        Ok(embeddings) => embeddings,
        Err(e) => {
            println!("Embeddings:        FAILED ({e})");
            return Ok(());
        }
    };
    println!("Embeddings:        {}", assets.embeddings_path().display());
    println!("  Vectors:         {}", embeddings.entries.len());
    println!("  Stored model:    {}", embeddings.model.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {}", config.provider.embedding_model);
    if let Some(ref stored) = embeddings.model {
        if stored != &config.provider.embedding_model {
            println!("  WARNING: model mismatch! Run `gita-match embed-corpus` to update vectors.");
        }
    }

    if let Some(encoder) = encoder {
        let (index, report) = KeyIndex::build(&encoder, &embeddings, &corpus);
        println!();
        println!("Key index:");
        println!("  Indexed:         {} of {} verses", index.len(), corpus.len());
        println!("  No embedding:    {}", report.missing.len());
        for skipped in &report.skipped {
            let why = match &skipped.reason {
                SkipReason::Dimension { actual, .. } => {
                    format!("{actual}-dim embedding, expected {INPUT_DIM}")
                }
                SkipReason::NotInCorpus => "no verse with this ID".to_string(),
                SkipReason::Duplicate => "duplicate ID".to_string(),
            };
            println!("  Skipped {:<9} {why}", skipped.id);
        }
        if index.is_empty() {
            println!("  WARNING: nothing is matchable; every query will report no match.");
        }
    }

    println!();
    let provider = match config.provider.kind.as_str() {
        "none" => "offline (provider = none)".to_string(),
        _ if config.provider.api_key.trim().is_empty() => {
            "offline (no OPENAI_API_KEY)".to_string()
        }
        kind => format!("{kind} ({})", config.provider.base_url),
    };
    println!("Provider:          {provider}");

    Ok(())
}
