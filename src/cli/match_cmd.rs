//! CLI `match` command: run one query through the engine and print the verse.

use anyhow::{Context, Result};

use gita_match::config::GitaConfig;
use gita_match::{GitaEngine, MatchOutcome};

use super::preview;

/// Match a statement from the terminal.
pub async fn match_query(config: &GitaConfig, query: &str, json: bool) -> Result<()> {
    let engine = GitaEngine::from_config(config).context("failed to create engine")?;
    let outcome = engine.match_query(query).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("failed to serialize outcome")?
        );
        return Ok(());
    }

    let result = match &outcome {
        MatchOutcome::Matched(result) => result,
        MatchOutcome::NoMatch(reason) => {
            println!("No match: {reason}.");
            return Ok(());
        }
    };

    let entry = &result.entry;
    println!("Bhagavad Gita {}.{} (score: {:.4})", entry.chapter, entry.verse, result.score);
    println!();
    if !entry.sanskrit.is_empty() {
        println!("  {}", entry.sanskrit);
    }
    if !entry.transliteration.is_empty() {
        println!("  {}", entry.transliteration);
    }
    println!();
    println!("  {}", entry.translation);
    if let Some(ref explanation) = entry.explanation {
        println!();
        println!("  {}", preview(explanation, 400));
    }

    if let Some(ref story) = result.narrative {
        println!();
        println!("Story: {}", story.title);
        println!("  {}", preview(&story.text, 400));
        if let Some(ref lesson) = story.moral_lesson {
            println!("  Lesson: {lesson}");
        }
    }

    let trace = &result.trace;
    println!();
    println!("Trace {}", trace.request_id);
    println!("  Method:          {}", trace.method);
    match (trace.detected_emotion, trace.emotion_score) {
        (Some(emotion), Some(score)) => println!(
            "  Emotion:         {emotion} ({score:.4}, {} tagged verses)",
            trace.emotion_tagged_count
        ),
        _ => println!("  Emotion:         (none detected)"),
    }
    if let Some(ref enhanced) = trace.enhanced_query {
        println!("  Paraphrase:      {}", preview(enhanced, 120));
    }
    for fallback in &trace.fallbacks {
        println!("  Fallback:        {fallback:?}");
    }
    println!("  Top candidates:");
    for (i, c) in trace.top_candidates.iter().enumerate() {
        println!(
            "    {}. {} raw {:.4} -> {:.4}{}",
            i + 1,
            c.id,
            c.raw,
            c.boosted,
            if c.is_boosted { " (boosted)" } else { "" }
        );
    }

    let cost = engine.usage().total_cost_usd();
    if cost > 0.0 {
        println!();
        println!("Estimated API cost: ${cost:.6}");
    }

    Ok(())
}
