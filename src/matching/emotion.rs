//! Emotion detection against the fixed label set, using the bi-encoder itself.
//!
//! Each label's text is embedded once by the provider, projected through the key path, and
//! kept in an [`EmotionLabelCache`] for the process lifetime. A query is projected through
//! the query path and scored against every cached label.

use crate::corpus::EmotionCategory;
use crate::embedding::EmbeddingProvider;
use crate::model::{BiEncoder, ProjectedVector};

use super::types::{EmotionDetection, EmotionScore};

/// Key projections of the emotion labels that could be embedded, in enumeration order.
#[derive(Debug, Default)]
pub struct EmotionLabelCache {
    labels: Vec<(EmotionCategory, ProjectedVector)>,
}

impl EmotionLabelCache {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Embed every label once. Labels the provider fails on (or returns at the wrong width)
    /// are left out; they are not retried later.
    pub async fn warm(encoder: &BiEncoder, provider: &dyn EmbeddingProvider) -> Self {
        let mut labels = Vec::with_capacity(EmotionCategory::ALL.len());
        for emotion in EmotionCategory::ALL {
            let raw = match provider.embed(emotion.as_str()).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(emotion = %emotion, error = %e, "label embedding unavailable");
                    continue;
                }
            };
            match encoder.encode_key(&raw) {
                Ok(projected) => labels.push((emotion, projected)),
                Err(e) => {
                    tracing::warn!(emotion = %emotion, error = %e, "label embedding rejected")
                }
            }
        }
        tracing::info!(
            cached = labels.len(),
            total = EmotionCategory::ALL.len(),
            "emotion label cache warmed"
        );
        Self { labels }
    }

    /// Build from precomputed projections. Order is normalized to enumeration order.
    pub fn from_projected(mut labels: Vec<(EmotionCategory, ProjectedVector)>) -> Self {
        labels.sort_by_key(|(e, _)| *e);
        labels.dedup_by_key(|(e, _)| *e);
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels with no cached vector.
    pub fn missing(&self) -> Vec<EmotionCategory> {
        EmotionCategory::ALL
            .into_iter()
            .filter(|e| !self.labels.iter().any(|(l, _)| l == e))
            .collect()
    }
}

/// Owns the label cache and scores queries against it.
#[derive(Debug, Default)]
pub struct EmotionDetector {
    cache: EmotionLabelCache,
}

impl EmotionDetector {
    pub fn new(cache: EmotionLabelCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &EmotionLabelCache {
        &self.cache
    }

    /// Detect from a raw query embedding. `None` when the embedding is rejected or no label
    /// vectors are available.
    pub fn detect(&self, encoder: &BiEncoder, query_embedding: &[f32]) -> Option<EmotionDetection> {
        match encoder.encode_query(query_embedding) {
            Ok(q) => self.detect_projected(&q),
            Err(e) => {
                tracing::warn!(error = %e, "cannot detect emotion for query");
                None
            }
        }
    }

    /// Highest-scoring label; ties go to the earlier label in enumeration order.
    pub fn detect_projected(&self, query: &ProjectedVector) -> Option<EmotionDetection> {
        let mut best: Option<EmotionScore> = None;
        let mut scores = Vec::with_capacity(self.cache.len());

        for (emotion, label) in &self.cache.labels {
            let score = query.dot(label);
            scores.push(EmotionScore {
                emotion: *emotion,
                score,
            });
            if !score.is_finite() {
                continue;
            }
            if best.map_or(true, |b| score > b.score) {
                best = Some(EmotionScore {
                    emotion: *emotion,
                    score,
                });
            }
        }

        let best = best?;
        tracing::debug!(emotion = %best.emotion, score = best.score, "emotion detected");
        Some(EmotionDetection {
            emotion: best.emotion,
            score: best.score,
            scores,
        })
    }
}
