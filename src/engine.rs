//! The matching engine: one-time initialization plus the `match` entry point.
//!
//! Weights, corpus, key index, and emotion labels are loaded at most once per engine. The
//! first callers of [`GitaEngine::ensure_initialized`] wait on an async mutex while one of them
//! does the work; later callers read the finished [`ReadyState`] without taking the lock.

use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

use crate::config::GitaConfig;
use crate::corpus::{AssetStore, Corpus, CorpusEntry, DirectoryAssets, Narrative};
use crate::embedding::{create_providers, ProviderSet, UsageTracker};
use crate::error::InitError;
use crate::matching::{
    run_match, EmotionDetector, EmotionLabelCache, IndexReport, KeyIndex, MatchContext,
    MatchOutcome, MatchSettings, NoMatchReason,
};
use crate::model::BiEncoder;

/// Everything built during initialization. Shared read-only by all requests.
#[derive(Debug)]
pub struct ReadyState {
    encoder: BiEncoder,
    corpus: Corpus,
    index: KeyIndex,
    report: IndexReport,
    detector: EmotionDetector,
}

impl ReadyState {
    pub fn encoder(&self) -> &BiEncoder {
        &self.encoder
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn index(&self) -> &KeyIndex {
        &self.index
    }

    /// What was skipped while building the key index.
    pub fn report(&self) -> &IndexReport {
        &self.report
    }

    pub fn detector(&self) -> &EmotionDetector {
        &self.detector
    }
}

pub struct GitaEngine {
    assets: Arc<dyn AssetStore>,
    providers: ProviderSet,
    settings: MatchSettings,
    usage: Arc<UsageTracker>,
    init_lock: Mutex<()>,
    ready: OnceLock<Arc<ReadyState>>,
}

impl GitaEngine {
    pub fn new(
        assets: Arc<dyn AssetStore>,
        providers: ProviderSet,
        settings: MatchSettings,
    ) -> Self {
        Self {
            assets,
            providers,
            settings,
            usage: Arc::new(UsageTracker::new()),
            init_lock: Mutex::new(()),
            ready: OnceLock::new(),
        }
    }

    /// Build an engine over the configured asset directory and providers. Nothing is loaded
    /// until the first request.
    pub fn from_config(config: &GitaConfig) -> anyhow::Result<Self> {
        let usage = Arc::new(UsageTracker::new());
        let providers = create_providers(&config.provider, Arc::clone(&usage))?;
        let assets = DirectoryAssets::new(config.resolved_assets_dir(), config.assets.clone());
        let mut engine = Self::new(
            Arc::new(assets),
            providers,
            MatchSettings::from(&config.matching),
        );
        engine.usage = usage;
        Ok(engine)
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    pub fn settings(&self) -> MatchSettings {
        self.settings
    }

    /// Token usage of this engine's provider calls.
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.get().is_some()
    }

    /// Load everything once. A failed attempt is not remembered; the next call tries again.
    pub async fn ensure_initialized(&self) -> Result<Arc<ReadyState>, InitError> {
        if let Some(ready) = self.ready.get() {
            return Ok(Arc::clone(ready));
        }

        let _guard = self.init_lock.lock().await;
        if let Some(ready) = self.ready.get() {
            return Ok(Arc::clone(ready));
        }

        let assets = Arc::clone(&self.assets);
        let (encoder, corpus, index, report) = tokio::task::spawn_blocking(move || {
            let weights = assets.load_weights()?;
            let corpus = assets.load_corpus()?;
            let embeddings = assets.load_embeddings()?;
            let encoder = BiEncoder::new(weights);
            let (index, report) = KeyIndex::build(&encoder, &embeddings, &corpus);
            Ok::<_, InitError>((encoder, corpus, index, report))
        })
        .await??;

        let cache = match self.providers.embedding() {
            Some(provider) => EmotionLabelCache::warm(&encoder, provider.as_ref()).await,
            None => {
                tracing::warn!("no embedding provider, emotion detection disabled");
                EmotionLabelCache::empty()
            }
        };

        let state = Arc::new(ReadyState {
            encoder,
            corpus,
            index,
            report,
            detector: EmotionDetector::new(cache),
        });
        // Only set while holding the lock, so this cannot race.
        let _ = self.ready.set(Arc::clone(&state));
        tracing::info!(
            entries = state.corpus.len(),
            indexed = state.index.len(),
            labels = state.detector.cache().len(),
            "engine initialized"
        );
        Ok(state)
    }

    /// Match a user statement against the corpus.
    pub async fn match_query(&self, text: &str) -> MatchOutcome {
        if text.trim().is_empty() {
            return MatchOutcome::NoMatch(NoMatchReason::EmptyQuery);
        }
        let state = match self.ensure_initialized().await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, "engine initialization failed");
                return MatchOutcome::NoMatch(NoMatchReason::EngineUnavailable);
            }
        };
        let ctx = MatchContext {
            encoder: &state.encoder,
            index: &state.index,
            corpus: &state.corpus,
            detector: &state.detector,
            providers: &self.providers,
            settings: self.settings,
        };
        run_match(ctx, text).await
    }

    /// Look up one verse and its linked narrative by ID.
    pub async fn get_entry(
        &self,
        id: &str,
    ) -> Result<Option<(CorpusEntry, Option<Narrative>)>, InitError> {
        let state = self.ensure_initialized().await?;
        Ok(state.corpus.entry(id).map(|entry| {
            let narrative = state.corpus.narrative_for(entry).cloned();
            (entry.clone(), narrative)
        }))
    }
}

impl std::fmt::Debug for GitaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitaEngine")
            .field("providers", &self.providers)
            .field("settings", &self.settings)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::RawEmbeddings;
    use crate::error::{CorpusError, FormatError};
    use crate::model::ModelWeights;

    struct BrokenAssets;

    impl AssetStore for BrokenAssets {
        fn load_weights(&self) -> Result<ModelWeights, FormatError> {
            Err(FormatError::InvalidMagic("NOT_GITA".into()))
        }

        fn load_corpus(&self) -> Result<Corpus, CorpusError> {
            Ok(Corpus::default())
        }

        fn load_embeddings(&self) -> Result<RawEmbeddings, CorpusError> {
            Ok(RawEmbeddings::default())
        }
    }

    #[tokio::test]
    async fn blank_query_short_circuits() {
        let engine = GitaEngine::new(
            Arc::new(BrokenAssets),
            ProviderSet::Offline,
            MatchSettings::default(),
        );
        let outcome = engine.match_query("   ").await;
        assert_eq!(outcome.no_match_reason(), Some(&NoMatchReason::EmptyQuery));
        assert!(!engine.is_initialized());
    }

    #[tokio::test]
    async fn failed_init_is_engine_unavailable_and_not_cached() {
        let engine = GitaEngine::new(
            Arc::new(BrokenAssets),
            ProviderSet::Offline,
            MatchSettings::default(),
        );
        let outcome = engine.match_query("I feel lost").await;
        assert_eq!(outcome.no_match_reason(), Some(&NoMatchReason::EngineUnavailable));
        assert!(!engine.is_initialized());
        assert!(matches!(
            engine.ensure_initialized().await,
            Err(InitError::Format(FormatError::InvalidMagic(_)))
        ));
    }
}
