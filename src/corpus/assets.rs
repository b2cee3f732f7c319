//! Asset loading: weight blob, verse JSON, enriched verse JSON, stories, and raw embeddings.
//!
//! [`AssetStore`] is the seam the engine initializes through; [`DirectoryAssets`] reads the
//! files named in [`AssetsConfig`](crate::config::AssetsConfig) from one directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{Corpus, CorpusEntry, EmotionCategory, Narrative};
use crate::config::AssetsConfig;
use crate::error::{CorpusError, FormatError};
use crate::model::{load_weights, ModelWeights};

/// Raw provider embeddings per entry ID, in file order.
#[derive(Debug, Clone, Default)]
pub struct RawEmbeddings {
    /// Embedding model the vectors were produced with, if recorded.
    pub model: Option<String>,
    pub entries: Vec<(String, Vec<f32>)>,
}

/// Read-only source of everything the engine needs at startup.
pub trait AssetStore: Send + Sync {
    fn load_weights(&self) -> Result<ModelWeights, FormatError>;
    fn load_corpus(&self) -> Result<Corpus, CorpusError>;
    fn load_embeddings(&self) -> Result<RawEmbeddings, CorpusError>;
}

/// Assets laid out as files in a single directory.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    dir: PathBuf,
    files: AssetsConfig,
}

impl DirectoryAssets {
    pub fn new(dir: impl Into<PathBuf>, files: AssetsConfig) -> Self {
        Self {
            dir: dir.into(),
            files,
        }
    }

    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(&self.files.weights_file)
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.dir.join(&self.files.embeddings_file)
    }
}

impl AssetStore for DirectoryAssets {
    fn load_weights(&self) -> Result<ModelWeights, FormatError> {
        load_weights(self.weights_path())
    }

    fn load_corpus(&self) -> Result<Corpus, CorpusError> {
        let verses: VersesFile =
            read_optional_json(&self.dir.join(&self.files.verses_file))?.unwrap_or_default();
        let enriched: Vec<EnrichedVerseRecord> =
            read_optional_json(&self.dir.join(&self.files.enriched_file))?.unwrap_or_default();
        let stories: StoriesFile =
            read_optional_json(&self.dir.join(&self.files.stories_file))?.unwrap_or_default();

        let entries = merge_verses(verses.verses, enriched);
        let corpus = Corpus::new(entries, stories.stories);
        tracing::info!(
            verses = corpus.len(),
            narratives = corpus.narrative_count(),
            "corpus loaded"
        );
        Ok(corpus)
    }

    fn load_embeddings(&self) -> Result<RawEmbeddings, CorpusError> {
        let path = self.embeddings_path();
        let Some(file) = read_optional_json::<EmbeddingsFile>(&path)? else {
            return Ok(RawEmbeddings::default());
        };
        Ok(file.into_raw())
    }
}

/// Write raw embeddings in the format [`DirectoryAssets::load_embeddings`] reads.
pub fn write_embeddings(
    path: &Path,
    model: &str,
    dimension: usize,
    entries: &[(String, Vec<f32>)],
) -> Result<(), CorpusError> {
    let mut map = serde_json::Map::with_capacity(entries.len());
    for (id, vector) in entries {
        map.insert(id.clone(), serde_json::json!(vector));
    }
    let file = EmbeddingsFile {
        model: Some(model.to_string()),
        dimension: Some(dimension),
        embeddings: map,
    };
    let json = serde_json::to_vec(&file).map_err(|source| CorpusError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    // Write to a sibling temp file and rename so readers never see a partial file.
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)
        .and_then(|_| std::fs::rename(&tmp, path))
        .map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })
}

// ── On-disk record shapes ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct VersesFile {
    #[serde(default)]
    verses: Vec<VerseRecord>,
}

#[derive(Debug, Deserialize)]
struct VerseRecord {
    id: String,
    chapter: u32,
    verse: u32,
    #[serde(default)]
    sanskrit: String,
    #[serde(default)]
    transliteration: String,
    #[serde(default)]
    translation: String,
    #[serde(default)]
    context: String,
    explanation: Option<String>,
    detailed_explanation: Option<String>,
    mythology_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnrichedVerseRecord {
    id: String,
    chapter_number: u32,
    verse_number: u32,
    #[serde(default)]
    sanskrit_text: String,
    #[serde(default)]
    transliteration: String,
    #[serde(default)]
    english_translation: String,
    #[serde(default)]
    emotion_category: String,
    arjuna_despair_link: Option<String>,
    modern_problem_match: Option<String>,
    wisdom_nugget: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoriesFile {
    #[serde(default)]
    stories: Vec<Narrative>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EmbeddingsFile {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    embeddings: serde_json::Map<String, serde_json::Value>,
}

impl EmbeddingsFile {
    fn into_raw(self) -> RawEmbeddings {
        let mut entries = Vec::with_capacity(self.embeddings.len());
        for (id, value) in self.embeddings {
            match serde_json::from_value::<Vec<f32>>(value) {
                Ok(vector) => entries.push((id, vector)),
                Err(e) => tracing::warn!(id = %id, error = %e, "skipping unreadable embedding"),
            }
        }
        RawEmbeddings {
            model: self.model,
            entries,
        }
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// `Ok(None)` when the file does not exist; parse failures are errors.
fn read_optional_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, CorpusError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "asset file not found, treating as empty");
        return Ok(None);
    }
    let bytes = std::fs::read(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| CorpusError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_emotion(id: &str, label: &str) -> Option<EmotionCategory> {
    if label.trim().is_empty() {
        return None;
    }
    match label.parse() {
        Ok(e) => Some(e),
        Err(_) => {
            tracing::warn!(id = %id, label = %label, "ignoring unknown emotion tag");
            None
        }
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// Plain verse records, overlaid by enriched records with the same ID. Enriched-only verses
/// are appended after the plain ones.
///
/// Only an enriched `emotion_category` tags an entry. A plain record's `feeling` list is
/// ignored.
fn merge_verses(
    verses: Vec<VerseRecord>,
    enriched: Vec<EnrichedVerseRecord>,
) -> Vec<CorpusEntry> {
    let mut entries: Vec<CorpusEntry> = verses
        .into_iter()
        .map(|v| CorpusEntry {
            id: v.id,
            chapter: v.chapter,
            verse: v.verse,
            sanskrit: v.sanskrit,
            transliteration: v.transliteration,
            translation: v.translation,
            context: v.context,
            explanation: non_blank(v.explanation),
            detailed_explanation: non_blank(v.detailed_explanation),
            emotion: None,
            narrative_key: non_blank(v.mythology_key),
        })
        .collect();

    let mut position: std::collections::HashMap<String, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.clone(), i))
        .collect();

    for r in enriched {
        let emotion = parse_emotion(&r.id, &r.emotion_category);
        match position.get(&r.id) {
            Some(&i) => {
                let e = &mut entries[i];
                if !r.sanskrit_text.is_empty() {
                    e.sanskrit = r.sanskrit_text;
                }
                if !r.transliteration.is_empty() {
                    e.transliteration = r.transliteration;
                }
                if !r.english_translation.is_empty() {
                    e.translation = r.english_translation;
                }
                if let Some(ctx) = non_blank(r.arjuna_despair_link) {
                    e.context = ctx;
                }
                if let Some(x) = non_blank(r.wisdom_nugget) {
                    e.explanation = Some(x);
                }
                if let Some(x) = non_blank(r.modern_problem_match) {
                    e.detailed_explanation = Some(x);
                }
                if emotion.is_some() {
                    e.emotion = emotion;
                }
            }
            None => {
                position.insert(r.id.clone(), entries.len());
                entries.push(CorpusEntry {
                    id: r.id,
                    chapter: r.chapter_number,
                    verse: r.verse_number,
                    sanskrit: r.sanskrit_text,
                    transliteration: r.transliteration,
                    translation: r.english_translation,
                    context: r.arjuna_despair_link.unwrap_or_default(),
                    explanation: non_blank(r.wisdom_nugget),
                    detailed_explanation: non_blank(r.modern_problem_match),
                    emotion,
                    narrative_key: None,
                });
            }
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn missing_files_load_as_empty() {
        let tmp = TempDir::new().unwrap();
        let assets = DirectoryAssets::new(tmp.path(), AssetsConfig::default());
        assert!(assets.load_corpus().unwrap().is_empty());
        assert!(assets.load_embeddings().unwrap().entries.is_empty());
        assert!(assets.load_weights().is_err());
    }

    #[test]
    fn enriched_records_override_plain_ones() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "verses.json",
            r#"{"verses": [
                {"id": "2.47", "chapter": 2, "verse": 47, "translation": "plain",
                 "context": "plain ctx", "feeling": ["calm", "Result-Obsession"],
                 "mythology_key": "chariot"},
                {"id": "2.14", "chapter": 2, "verse": 14, "translation": "heat and cold"}
            ]}"#,
        );
        write(
            tmp.path(),
            "enriched_verses.json",
            r#"[
                {"id": "2.14", "chapter_number": 2, "verse_number": 14,
                 "english_translation": "contacts of the senses", "emotion_category": "Anxiety",
                 "wisdom_nugget": "This too passes."},
                {"id": "18.66", "chapter_number": 18, "verse_number": 66,
                 "english_translation": "surrender", "emotion_category": "Loneliness",
                 "arjuna_despair_link": "the final counsel"}
            ]"#,
        );
        write(
            tmp.path(),
            "stories.json",
            r#"{"stories": [{"key": "chariot", "title": "The Chariot", "text": "..."}]}"#,
        );

        let corpus = DirectoryAssets::new(tmp.path(), AssetsConfig::default())
            .load_corpus()
            .unwrap();
        assert_eq!(corpus.len(), 3);

        let a = corpus.entry("2.47").unwrap();
        assert_eq!(a.emotion, None);
        assert_eq!(corpus.narrative_for(a).unwrap().title, "The Chariot");

        let b = corpus.entry("2.14").unwrap();
        assert_eq!(b.translation, "contacts of the senses");
        assert_eq!(b.emotion, Some(EmotionCategory::Anxiety));
        assert_eq!(b.explanation.as_deref(), Some("This too passes."));

        let c = corpus.entry("18.66").unwrap();
        assert_eq!(c.chapter, 18);
        assert_eq!(c.context, "the final counsel");
        assert_eq!(c.emotion, Some(EmotionCategory::Loneliness));

        let ids: Vec<&str> = corpus.entries().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["2.47", "2.14", "18.66"]);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "verses.json", "{ not json");
        let err = DirectoryAssets::new(tmp.path(), AssetsConfig::default())
            .load_corpus()
            .unwrap_err();
        assert!(matches!(err, CorpusError::Json { .. }));
    }

    #[test]
    fn embeddings_keep_file_order_and_skip_garbage() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "verse_embeddings.json",
            r#"{"model": "text-embedding-3-small", "dimension": 3,
                "embeddings": {"b": [0.1, 0.2, 0.3], "a": [1, 2, 3], "bad": "nope", "c": []}}"#,
        );
        let raw = DirectoryAssets::new(tmp.path(), AssetsConfig::default())
            .load_embeddings()
            .unwrap();
        assert_eq!(raw.model.as_deref(), Some("text-embedding-3-small"));
        let ids: Vec<&str> = raw.entries.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(raw.entries[1].1, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn write_then_load_embeddings() {
        let tmp = TempDir::new().unwrap();
        let assets = DirectoryAssets::new(tmp.path(), AssetsConfig::default());
        let entries = vec![
            ("2.47".to_string(), vec![0.5f32, -0.25]),
            ("1.1".to_string(), vec![0.0f32, 1.0]),
        ];
        write_embeddings(&assets.embeddings_path(), "m", 2, &entries).unwrap();

        let raw = assets.load_embeddings().unwrap();
        assert_eq!(raw.model.as_deref(), Some("m"));
        assert_eq!(raw.entries, entries);
    }
}
