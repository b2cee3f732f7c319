//! Per-model token accounting for provider calls, with an estimated dollar cost.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Cumulative usage for one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelUsage {
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
}

/// Thread-safe usage ledger shared by all provider clients of a process.
#[derive(Debug, Default)]
pub struct UsageTracker {
    by_model: Mutex<BTreeMap<String, ModelUsage>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one API call. `total_tokens` defaults to prompt + completion when absent.
    pub fn record(
        &self,
        model: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: Option<u64>,
    ) {
        let (input_price, output_price) = price_per_million(model);
        let cost = prompt_tokens as f64 / 1_000_000.0 * input_price
            + completion_tokens as f64 / 1_000_000.0 * output_price;
        let total = total_tokens.unwrap_or(prompt_tokens + completion_tokens);

        let mut map = self.by_model.lock().unwrap_or_else(|e| e.into_inner());
        let entry = map.entry(model.to_string()).or_default();
        entry.requests += 1;
        entry.prompt_tokens += prompt_tokens;
        entry.completion_tokens += completion_tokens;
        entry.total_tokens += total;
        entry.estimated_cost_usd += cost;

        tracing::info!(
            model = %model,
            prompt_tokens,
            completion_tokens,
            total_tokens = total,
            cost_usd = cost,
            session_cost_usd = entry.estimated_cost_usd,
            "provider usage"
        );
    }

    pub fn snapshot(&self) -> BTreeMap<String, ModelUsage> {
        self.by_model.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn total_cost_usd(&self) -> f64 {
        self.by_model
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|u| u.estimated_cost_usd)
            .sum()
    }
}

/// (input, output) USD per million tokens.
fn price_per_million(model: &str) -> (f64, f64) {
    let m = model.to_ascii_lowercase();
    if m.contains("embedding-3-small") {
        (0.02, 0.0)
    } else if m.contains("embedding-3-large") {
        (0.13, 0.0)
    } else if m.contains("ada-002") {
        (0.10, 0.0)
    } else if m.contains("gpt-4o-mini") {
        (0.15, 0.60)
    } else if m.contains("gpt-4") && m.contains("turbo") {
        (10.0, 30.0)
    } else if m.contains("gpt-4") {
        (30.0, 60.0)
    } else if m.contains("gpt-3.5") {
        (0.50, 1.50)
    } else {
        (0.02, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_per_model() {
        let tracker = UsageTracker::new();
        tracker.record("text-embedding-3-small", 1_000_000, 0, None);
        tracker.record("text-embedding-3-small", 500_000, 0, Some(500_000));
        tracker.record("gpt-4o-mini", 1_000_000, 1_000_000, None);

        let snap = tracker.snapshot();
        let emb = &snap["text-embedding-3-small"];
        assert_eq!(emb.requests, 2);
        assert_eq!(emb.total_tokens, 1_500_000);
        assert!((emb.estimated_cost_usd - 0.03).abs() < 1e-9);

        let chat = &snap["gpt-4o-mini"];
        assert_eq!(chat.total_tokens, 2_000_000);
        assert!((chat.estimated_cost_usd - 0.75).abs() < 1e-9);

        assert!((tracker.total_cost_usd() - 0.78).abs() < 1e-9);
    }

    #[test]
    fn pricing_falls_back_to_embedding_rate() {
        assert_eq!(price_per_million("some-new-model"), (0.02, 0.0));
        assert_eq!(price_per_million("GPT-4-Turbo"), (10.0, 30.0));
    }
}
