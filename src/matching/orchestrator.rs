//! The per-request stage machine.
//!
//! ```text
//! RequestQueryEmbedding → DetectEmotion → RequestEnhancedQueryEmbedding
//!     → EncodeQuery → RankAndBoost → ResolveEntryMetadata → EmitResult
//! ```
//!
//! Each stage either advances along [`MatchStage::next`] or ends the request with a
//! [`NoMatchReason`]. Provider failures after the query embedding never end a request; they
//! are recorded as [`Fallback`]s and the stage continues on the unenhanced path.

use chrono::Utc;
use std::time::Instant;
use uuid::Uuid;

use crate::corpus::{Corpus, CorpusEntry, EmotionCategory};
use crate::embedding::{ProviderSet, QueryUnderstanding};
use crate::model::{check_input_dim, BiEncoder, ProjectedVector};

use super::emotion::EmotionDetector;
use super::index::KeyIndex;
use super::rank::{self, Ranking};
use super::types::{
    DebugTrace, EmotionDetection, Fallback, MatchMethod, MatchOutcome, MatchResult, NoMatchReason,
};
use super::MatchSettings;

/// Named stages of one match request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStage {
    RequestQueryEmbedding,
    DetectEmotion,
    RequestEnhancedQueryEmbedding,
    EncodeQuery,
    RankAndBoost,
    ResolveEntryMetadata,
    EmitResult,
}

impl MatchStage {
    pub const FIRST: MatchStage = MatchStage::RequestQueryEmbedding;

    /// Transition table. `None` after the terminal stage.
    pub fn next(self) -> Option<MatchStage> {
        use MatchStage::*;
        match self {
            RequestQueryEmbedding => Some(DetectEmotion),
            DetectEmotion => Some(RequestEnhancedQueryEmbedding),
            RequestEnhancedQueryEmbedding => Some(EncodeQuery),
            EncodeQuery => Some(RankAndBoost),
            RankAndBoost => Some(ResolveEntryMetadata),
            ResolveEntryMetadata => Some(EmitResult),
            EmitResult => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestQueryEmbedding => "request_query_embedding",
            Self::DetectEmotion => "detect_emotion",
            Self::RequestEnhancedQueryEmbedding => "request_enhanced_query_embedding",
            Self::EncodeQuery => "encode_query",
            Self::RankAndBoost => "rank_and_boost",
            Self::ResolveEntryMetadata => "resolve_entry_metadata",
            Self::EmitResult => "emit_result",
        }
    }
}

impl std::fmt::Display for MatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a request reads. All of it is shared and immutable.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub encoder: &'a BiEncoder,
    pub index: &'a KeyIndex,
    pub corpus: &'a Corpus,
    pub detector: &'a EmotionDetector,
    pub providers: &'a ProviderSet,
    pub settings: MatchSettings,
}

/// Result of running one stage.
enum Transition {
    Advance,
    Emit(Box<MatchResult>),
}

/// Mutable state of one request as it moves through the stages.
struct MatchRun<'a> {
    ctx: MatchContext<'a>,
    text: &'a str,
    request_id: Uuid,
    query_embedding: Vec<f32>,
    enhanced: bool,
    understanding: Option<QueryUnderstanding>,
    detection: Option<EmotionDetection>,
    fallbacks: Vec<Fallback>,
    projected: Option<ProjectedVector>,
    ranking: Ranking,
    entry: Option<CorpusEntry>,
}

/// Run one request through every stage.
pub async fn run_match(ctx: MatchContext<'_>, text: &str) -> MatchOutcome {
    let started = Instant::now();
    let request_id = Uuid::now_v7();

    if ctx.index.is_empty() {
        tracing::warn!(%request_id, "key index is empty, nothing to match");
        return MatchOutcome::NoMatch(NoMatchReason::EmptyIndex);
    }

    let mut run = MatchRun {
        ctx,
        text,
        request_id,
        query_embedding: Vec::new(),
        enhanced: false,
        understanding: None,
        detection: None,
        fallbacks: Vec::new(),
        projected: None,
        ranking: Ranking::default(),
        entry: None,
    };

    let mut stage = MatchStage::FIRST;
    loop {
        tracing::trace!(%request_id, stage = %stage, "entering stage");
        match run.step(stage).await {
            Ok(Transition::Emit(result)) => {
                tracing::info!(
                    %request_id,
                    entry = %result.entry.id,
                    score = result.score,
                    method = %result.trace.method,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "match complete"
                );
                return MatchOutcome::Matched(result);
            }
            Ok(Transition::Advance) => {}
            Err(reason) => {
                tracing::info!(%request_id, stage = %stage, reason = %reason, "no match");
                return MatchOutcome::NoMatch(reason);
            }
        }
        match stage.next() {
            Some(next) => stage = next,
            None => break,
        }
    }

    // Every path through the table ends in EmitResult.
    tracing::error!(%request_id, "stage table ended without a result");
    MatchOutcome::NoMatch(NoMatchReason::NoFiniteScore)
}

impl MatchRun<'_> {
    async fn step(&mut self, stage: MatchStage) -> Result<Transition, NoMatchReason> {
        let transition = match stage {
            MatchStage::RequestQueryEmbedding => self.request_query_embedding().await?,
            MatchStage::DetectEmotion => self.detect_emotion()?,
            MatchStage::RequestEnhancedQueryEmbedding => self.request_enhanced_embedding().await?,
            MatchStage::EncodeQuery => self.encode_query()?,
            MatchStage::RankAndBoost => self.rank_and_boost()?,
            MatchStage::ResolveEntryMetadata => self.resolve_entry_metadata()?,
            MatchStage::EmitResult => self.emit_result()?,
        };
        Ok(transition.unwrap_or(Transition::Advance))
    }

    async fn request_query_embedding(&mut self) -> Result<Option<Transition>, NoMatchReason> {
        let provider = self
            .ctx
            .providers
            .embedding()
            .ok_or(NoMatchReason::NoProvider)?;
        let embedding = provider.embed(self.text).await.map_err(|e| {
            tracing::warn!(request_id = %self.request_id, error = %e, "query embedding failed");
            NoMatchReason::QueryEmbeddingUnavailable
        })?;
        check_input_dim(&embedding).map_err(|e| NoMatchReason::QueryDimension {
            expected: e.expected,
            actual: e.actual,
        })?;
        self.query_embedding = embedding;
        Ok(None)
    }

    fn detect_emotion(&mut self) -> Result<Option<Transition>, NoMatchReason> {
        self.detection = self
            .ctx
            .detector
            .detect(self.ctx.encoder, &self.query_embedding);
        if self.detection.is_none() {
            self.fallbacks.push(Fallback::EmotionUnavailable);
        }
        Ok(None)
    }

    async fn request_enhanced_embedding(&mut self) -> Result<Option<Transition>, NoMatchReason> {
        let Some(understanding) = self.ctx.providers.understanding() else {
            return Ok(None);
        };
        let understood = match understanding.understand(self.text).await {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(request_id = %self.request_id, error = %e, "paraphrase unavailable");
                self.fallbacks.push(Fallback::ParaphraseUnavailable);
                return Ok(None);
            }
        };

        let enhanced = match self.ctx.providers.embedding() {
            Some(provider) => provider.embed(&understood.enhanced_query).await.ok(),
            None => None,
        };
        match enhanced {
            Some(embedding) if check_input_dim(&embedding).is_ok() => {
                self.query_embedding = embedding;
                self.enhanced = true;
            }
            _ => {
                tracing::warn!(request_id = %self.request_id, "paraphrase could not be embedded");
                self.fallbacks.push(Fallback::EnhancedEmbeddingUnavailable);
            }
        }
        self.understanding = Some(understood);
        Ok(None)
    }

    fn encode_query(&mut self) -> Result<Option<Transition>, NoMatchReason> {
        let projected = self
            .ctx
            .encoder
            .encode_query(&self.query_embedding)
            .map_err(|e| NoMatchReason::QueryDimension {
                expected: e.expected,
                actual: e.actual,
            })?;
        self.projected = Some(projected);
        Ok(None)
    }

    fn rank_and_boost(&mut self) -> Result<Option<Transition>, NoMatchReason> {
        let projected = self
            .projected
            .as_ref()
            .ok_or(NoMatchReason::QueryEmbeddingUnavailable)?;
        let corpus = self.ctx.corpus;
        self.ranking = rank::rank(
            projected,
            self.ctx.index,
            self.detected_emotion(),
            |id| corpus.emotion_of(id),
            self.ctx.settings.emotion_boost,
        );
        if self.ranking.is_empty() {
            return Err(NoMatchReason::NoFiniteScore);
        }
        Ok(None)
    }

    fn resolve_entry_metadata(&mut self) -> Result<Option<Transition>, NoMatchReason> {
        let best = self.ranking.best().ok_or(NoMatchReason::NoFiniteScore)?;
        let entry = self
            .ctx
            .corpus
            .entry(&best.id)
            .ok_or_else(|| NoMatchReason::MetadataMissing {
                id: best.id.clone(),
            })?;
        self.entry = Some(entry.clone());
        Ok(None)
    }

    fn emit_result(&mut self) -> Result<Option<Transition>, NoMatchReason> {
        let entry = self.entry.take().ok_or(NoMatchReason::NoFiniteScore)?;
        let best = self.ranking.best().ok_or(NoMatchReason::NoFiniteScore)?;
        let emotion = self.detected_emotion();
        let narrative = self.ctx.corpus.narrative_for(&entry).cloned();
        let understanding = self.understanding.take().unwrap_or_default();

        let trace = DebugTrace {
            request_id: self.request_id,
            matched_at: Utc::now(),
            input_text: self.text.to_string(),
            enhanced_query: Some(understanding.enhanced_query).filter(|q| !q.trim().is_empty()),
            understood_emotions: understanding.emotions,
            detected_emotion: emotion,
            emotion_score: self.detection.as_ref().map(|d| d.score),
            emotion_scores: self
                .detection
                .as_ref()
                .map(|d| d.scores.clone())
                .unwrap_or_default(),
            emotion_tagged_count: emotion.map_or(0, |e| self.ctx.corpus.tagged_count(e)),
            matched_entry_id: entry.id.clone(),
            method: MatchMethod::from_flags(self.enhanced, emotion.is_some()),
            fallbacks: std::mem::take(&mut self.fallbacks),
            top_candidates: self
                .ranking
                .boosted
                .iter()
                .take(self.ctx.settings.debug_top_n)
                .cloned()
                .collect(),
        };

        Ok(Some(Transition::Emit(Box::new(MatchResult {
            score: best.boosted,
            entry,
            narrative,
            trace,
        }))))
    }

    fn detected_emotion(&self) -> Option<EmotionCategory> {
        self.detection.as_ref().map(|d| d.emotion)
    }
}
