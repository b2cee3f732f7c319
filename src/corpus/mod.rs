//! Static reference data: verses, their linked narratives, and raw embeddings.
//!
//! The corpus is loaded once at startup through an [`AssetStore`] and never changes
//! afterwards. [`CorpusEntry`] is what a match returns; [`Narrative`] is the story a verse
//! may link to via its `narrative_key`.

pub mod assets;
pub mod emotion;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use assets::{AssetStore, DirectoryAssets, RawEmbeddings};
pub use emotion::EmotionCategory;

/// One matchable verse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusEntry {
    /// Stable identifier, e.g. `"2.47"`.
    pub id: String,
    pub chapter: u32,
    pub verse: u32,
    pub sanskrit: String,
    pub transliteration: String,
    pub translation: String,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_explanation: Option<String>,
    /// Emotion category this verse is curated for. Drives ranking boosts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<EmotionCategory>,
    /// Key into the narrative collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative_key: Option<String>,
}

impl CorpusEntry {
    /// Text embedded for the key index: translation, context, then explanation, skipping
    /// blanks.
    pub fn embedding_text(&self) -> String {
        [
            Some(self.translation.as_str()),
            Some(self.context.as_str()),
            self.explanation.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// A story linked from one or more verses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_themes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moral_lesson: Option<String>,
}

/// Verse and narrative metadata, keyed by ID.
#[derive(Debug, Default)]
pub struct Corpus {
    entries: HashMap<String, CorpusEntry>,
    order: Vec<String>,
    narratives: HashMap<String, Narrative>,
}

impl Corpus {
    /// Later entries with a duplicate ID replace earlier ones but keep the first position.
    pub fn new(entries: Vec<CorpusEntry>, narratives: Vec<Narrative>) -> Self {
        let mut map = HashMap::with_capacity(entries.len());
        let mut order = Vec::with_capacity(entries.len());
        for entry in entries {
            if !map.contains_key(&entry.id) {
                order.push(entry.id.clone());
            }
            map.insert(entry.id.clone(), entry);
        }
        let narratives = narratives.into_iter().map(|n| (n.key.clone(), n)).collect();
        Self {
            entries: map,
            order,
            narratives,
        }
    }

    pub fn entry(&self, id: &str) -> Option<&CorpusEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Entries in load order.
    pub fn entries(&self) -> impl Iterator<Item = &CorpusEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// The narrative an entry links to, if the link resolves.
    pub fn narrative_for(&self, entry: &CorpusEntry) -> Option<&Narrative> {
        entry
            .narrative_key
            .as_deref()
            .and_then(|key| self.narratives.get(key))
    }

    /// Number of entries tagged with `emotion`.
    pub fn tagged_count(&self, emotion: EmotionCategory) -> usize {
        self.entries
            .values()
            .filter(|e| e.emotion == Some(emotion))
            .count()
    }

    pub fn emotion_of(&self, id: &str) -> Option<EmotionCategory> {
        self.entries.get(id).and_then(|e| e.emotion)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn narrative_count(&self) -> usize {
        self.narratives.len()
    }
}
