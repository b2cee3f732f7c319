//! Precomputed key projections for every matchable corpus entry.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::corpus::{Corpus, RawEmbeddings};
use crate::error::DimensionError;
use crate::model::{BiEncoder, ProjectedVector};

/// Ordered, immutable map from entry ID to its key projection.
#[derive(Debug, Default)]
pub struct KeyIndex {
    ids: Vec<String>,
    vectors: Vec<ProjectedVector>,
    positions: HashMap<String, usize>,
}

/// Why an embedding did not make it into the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Dimension { expected: usize, actual: usize },
    NotInCorpus,
    Duplicate,
}

impl From<DimensionError> for SkipReason {
    fn from(e: DimensionError) -> Self {
        Self::Dimension {
            expected: e.expected,
            actual: e.actual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub id: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// What happened while building the index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub indexed: usize,
    pub skipped: Vec<SkippedEntry>,
    /// Corpus entries that had no embedding at all.
    pub missing: Vec<String>,
}

impl KeyIndex {
    /// Encode every raw embedding whose ID exists in `corpus`. Bad entries are skipped and
    /// reported, never fatal.
    pub fn build(
        encoder: &BiEncoder,
        embeddings: &RawEmbeddings,
        corpus: &Corpus,
    ) -> (Self, IndexReport) {
        let mut entries = Vec::with_capacity(embeddings.entries.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(embeddings.entries.len());
        let mut report = IndexReport::default();

        for (id, raw) in &embeddings.entries {
            let reason = if !corpus.contains(id) {
                Some(SkipReason::NotInCorpus)
            } else if seen.contains(id.as_str()) {
                Some(SkipReason::Duplicate)
            } else {
                match encoder.encode_key(raw) {
                    Ok(projected) => {
                        seen.insert(id.as_str());
                        entries.push((id.clone(), projected));
                        None
                    }
                    Err(e) => Some(e.into()),
                }
            };
            if let Some(reason) = reason {
                tracing::warn!(id = %id, reason = ?reason, "excluding entry from key index");
                report.skipped.push(SkippedEntry {
                    id: id.clone(),
                    reason,
                });
            }
        }

        report.missing = corpus
            .entries()
            .filter(|e| !seen.contains(e.id.as_str()))
            .map(|e| e.id.clone())
            .collect();
        if !report.missing.is_empty() {
            tracing::warn!(
                count = report.missing.len(),
                "corpus entries without embeddings are not matchable"
            );
        }

        let index = Self::from_projected(entries);
        report.indexed = index.len();
        tracing::info!(indexed = report.indexed, skipped = report.skipped.len(), "key index built");
        (index, report)
    }

    /// Index already-projected vectors. Later duplicates of an ID are dropped.
    pub fn from_projected(entries: Vec<(String, ProjectedVector)>) -> Self {
        let mut index = Self::default();
        for (id, vector) in entries {
            if index.positions.contains_key(&id) {
                continue;
            }
            index.positions.insert(id.clone(), index.ids.len());
            index.ids.push(id);
            index.vectors.push(vector);
        }
        index
    }

    pub fn get(&self, id: &str) -> Option<&ProjectedVector> {
        self.positions.get(id).map(|&i| &self.vectors[i])
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProjectedVector)> {
        self.ids.iter().map(String::as_str).zip(self.vectors.iter())
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
