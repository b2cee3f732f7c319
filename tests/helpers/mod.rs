#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gita_match::corpus::{
    AssetStore, Corpus, CorpusEntry, EmotionCategory, Narrative, RawEmbeddings,
};
use gita_match::embedding::{
    EmbeddingProvider, ProviderSet, QueryUnderstanding, UnderstandingProvider,
};
use gita_match::error::{CorpusError, FormatError, ProviderError};
use gita_match::model::{write_weights, ModelWeights, HIDDEN_DIM, INPUT_DIM, PROJ_DIM};

/// Weights whose query path copies the first PROJ_DIM inputs and whose key path copies
/// ReLU of the first HIDDEN_DIM inputs. Scores are then easy to reason about.
pub fn passthrough_weights() -> ModelWeights {
    let mut w = ModelWeights::zeros();
    for i in 0..PROJ_DIM {
        w.query_proj[[i, i]] = 1.0;
    }
    for j in 0..HIDDEN_DIM {
        w.key_fc1_weight[[j, j]] = 1.0;
        w.key_fc2_weight[[j, j]] = 1.0;
    }
    w
}

/// Deterministic pseudo-random weights (no RNG dependency).
pub fn seeded_weights(seed: u32) -> ModelWeights {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        (state as f32 / u32::MAX as f32) - 0.5
    };
    let mut w = ModelWeights::zeros();
    w.query_proj.mapv_inplace(|_| next());
    w.key_fc1_weight.mapv_inplace(|_| next());
    w.key_fc1_bias.mapv_inplace(|_| next());
    w.key_fc2_weight.mapv_inplace(|_| next());
    w.key_fc2_bias.mapv_inplace(|_| next());
    w
}

/// A D-dim raw embedding with the given spikes.
pub fn spike(spikes: &[(usize, f32)]) -> Vec<f32> {
    let mut v = vec![0.0f32; INPUT_DIM];
    for &(i, x) in spikes {
        v[i] = x;
    }
    v
}

pub fn verse(id: &str, emotion: Option<EmotionCategory>, narrative: Option<&str>) -> CorpusEntry {
    let (chapter, verse) = id
        .split_once('.')
        .and_then(|(c, v)| Some((c.parse().ok()?, v.parse().ok()?)))
        .unwrap_or((0, 0));
    CorpusEntry {
        id: id.into(),
        chapter,
        verse,
        sanskrit: String::new(),
        transliteration: String::new(),
        translation: format!("Translation of {id}"),
        context: String::new(),
        explanation: None,
        detailed_explanation: None,
        emotion,
        narrative_key: narrative.map(Into::into),
    }
}

pub fn story(key: &str, title: &str) -> Narrative {
    Narrative {
        key: key.into(),
        title: title.into(),
        text: format!("The story of {title}."),
        detailed_explanation: None,
        key_themes: vec![],
        moral_lesson: None,
    }
}

// ── Fake providers ────────────────────────────────────────────────────────────

/// Embeds known texts from a lookup table; anything else is a transport failure.
#[derive(Default)]
pub struct FakeEmbedder {
    table: HashMap<String, Vec<f32>>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }

    /// Give each emotion label an axis: label `i` embeds to a spike at dim `i`.
    pub fn with_emotion_labels(mut self) -> Self {
        for (i, e) in EmotionCategory::ALL.iter().enumerate() {
            self.table.insert(e.as_str().to_string(), spike(&[(i, 1.0)]));
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| ProviderError::Transport(format!("no fake embedding for {text:?}")))
    }

    fn model(&self) -> &str {
        "fake-embedding"
    }
}

/// Returns a fixed paraphrase, or fails when none is set.
pub struct FakeUnderstanding {
    pub enhanced: Option<String>,
}

#[async_trait]
impl UnderstandingProvider for FakeUnderstanding {
    async fn understand(&self, _text: &str) -> Result<QueryUnderstanding, ProviderError> {
        match &self.enhanced {
            Some(q) => Ok(QueryUnderstanding {
                emotions: vec![],
                themes: vec![],
                intent: "guidance".into(),
                enhanced_query: q.clone(),
            }),
            None => Err(ProviderError::Status {
                status: 503,
                body: "overloaded".into(),
            }),
        }
    }
}

pub fn external(embedder: FakeEmbedder, understanding: Option<FakeUnderstanding>) -> ProviderSet {
    ProviderSet::External {
        embedding: Arc::new(embedder),
        understanding: understanding.map(|u| Arc::new(u) as Arc<dyn UnderstandingProvider>),
    }
}

// ── In-memory assets ──────────────────────────────────────────────────────────

/// Asset store backed by values, counting how often weights are loaded.
pub struct MemoryAssets {
    pub weights: ModelWeights,
    pub entries: Vec<CorpusEntry>,
    pub narratives: Vec<Narrative>,
    pub embeddings: Vec<(String, Vec<f32>)>,
    pub weight_loads: AtomicUsize,
}

impl MemoryAssets {
    pub fn new(weights: ModelWeights) -> Self {
        Self {
            weights,
            entries: vec![],
            narratives: vec![],
            embeddings: vec![],
            weight_loads: AtomicUsize::new(0),
        }
    }

    pub fn with_verse(mut self, entry: CorpusEntry, embedding: Vec<f32>) -> Self {
        self.embeddings.push((entry.id.clone(), embedding));
        self.entries.push(entry);
        self
    }

    pub fn with_story(mut self, narrative: Narrative) -> Self {
        self.narratives.push(narrative);
        self
    }

    pub fn load_count(&self) -> usize {
        self.weight_loads.load(Ordering::SeqCst)
    }
}

impl AssetStore for MemoryAssets {
    fn load_weights(&self) -> Result<ModelWeights, FormatError> {
        self.weight_loads.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which concurrent callers could race.
        std::thread::sleep(Duration::from_millis(20));
        Ok(self.weights.clone())
    }

    fn load_corpus(&self) -> Result<Corpus, CorpusError> {
        Ok(Corpus::new(self.entries.clone(), self.narratives.clone()))
    }

    fn load_embeddings(&self) -> Result<RawEmbeddings, CorpusError> {
        Ok(RawEmbeddings {
            model: Some("fake-embedding".into()),
            entries: self.embeddings.clone(),
        })
    }
}

// ── On-disk assets ────────────────────────────────────────────────────────────

pub fn write_weights_file(dir: &Path, name: &str, weights: &ModelWeights) {
    let file = std::fs::File::create(dir.join(name)).unwrap();
    write_weights(std::io::BufWriter::new(file), weights).unwrap();
}

pub fn write_json(dir: &Path, name: &str, value: &serde_json::Value) {
    std::fs::write(dir.join(name), serde_json::to_vec_pretty(value).unwrap()).unwrap();
}
