//! Match outcomes and the debug trace recorded for every request.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::corpus::{CorpusEntry, EmotionCategory, Narrative};

/// Score of the query against one emotion label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmotionScore {
    pub emotion: EmotionCategory,
    pub score: f32,
}

/// Best emotion label for a query plus the full score map, in enumeration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionDetection {
    pub emotion: EmotionCategory,
    pub score: f32,
    pub scores: Vec<EmotionScore>,
}

/// One indexed entry's score before and after the emotion boost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEntry {
    pub id: String,
    /// Position in the key index; the tie-break for equal scores.
    #[serde(skip)]
    pub position: usize,
    pub raw: f32,
    pub boosted: f32,
    /// Whether the boost was applied to this entry.
    pub is_boosted: bool,
}

/// How the winning entry was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    /// Paraphrased query embedding, emotion boost applied.
    AiEnhancedSemanticWithEmotionBoost,
    /// Paraphrased query embedding, no emotion detected.
    AiEnhancedSemantic,
    /// Original query embedding, emotion boost applied.
    SemanticWithEmotionBoost,
    /// Original query embedding only.
    Semantic,
}

impl MatchMethod {
    pub fn from_flags(enhanced: bool, emotion_boost: bool) -> Self {
        match (enhanced, emotion_boost) {
            (true, true) => Self::AiEnhancedSemanticWithEmotionBoost,
            (true, false) => Self::AiEnhancedSemantic,
            (false, true) => Self::SemanticWithEmotionBoost,
            (false, false) => Self::Semantic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiEnhancedSemanticWithEmotionBoost => "ai-enhanced-semantic-with-emotion-boost",
            Self::AiEnhancedSemantic => "ai-enhanced-semantic",
            Self::SemanticWithEmotionBoost => "semantic-with-emotion-boost",
            Self::Semantic => "semantic",
        }
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recovered provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// No label vectors were available, so no emotion boost.
    EmotionUnavailable,
    /// The understanding provider failed; the original text was used.
    ParaphraseUnavailable,
    /// The paraphrase could not be embedded; the original embedding was used.
    EnhancedEmbeddingUnavailable,
}

/// Why a request produced no match. An expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NoMatchReason {
    #[error("query text is empty")]
    EmptyQuery,
    #[error("matching engine failed to initialize")]
    EngineUnavailable,
    #[error("no embedding provider is configured")]
    NoProvider,
    #[error("query embedding could not be obtained")]
    QueryEmbeddingUnavailable,
    #[error("query embedding must be {expected}-dim, got {actual}")]
    QueryDimension { expected: usize, actual: usize },
    #[error("key index is empty")]
    EmptyIndex,
    #[error("no entry produced a finite score")]
    NoFiniteScore,
    #[error("matched entry {id} has no metadata")]
    MetadataMissing { id: String },
}

/// Intermediate decisions of one match request, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct DebugTrace {
    pub request_id: Uuid,
    pub matched_at: DateTime<Utc>,
    pub input_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_query: Option<String>,
    /// Labels reported by the understanding provider. Advisory only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub understood_emotions: Vec<String>,
    pub detected_emotion: Option<EmotionCategory>,
    pub emotion_score: Option<f32>,
    pub emotion_scores: Vec<EmotionScore>,
    /// Corpus entries carrying the detected emotion tag.
    pub emotion_tagged_count: usize,
    pub matched_entry_id: String,
    pub method: MatchMethod,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<Fallback>,
    /// Best candidates after boosting.
    pub top_candidates: Vec<ScoredEntry>,
}

/// The winning entry with its linked narrative and final score.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub entry: CorpusEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<Narrative>,
    pub score: f32,
    pub trace: DebugTrace,
}

/// What callers of `match` see.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched(Box<MatchResult>),
    NoMatch(NoMatchReason),
}

impl MatchOutcome {
    pub fn matched(&self) -> Option<&MatchResult> {
        match self {
            Self::Matched(r) => Some(r),
            Self::NoMatch(_) => None,
        }
    }

    pub fn no_match_reason(&self) -> Option<&NoMatchReason> {
        match self {
            Self::Matched(_) => None,
            Self::NoMatch(reason) => Some(reason),
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}
