//! Query-to-verse matching.
//!
//! | Module | Role |
//! |---|---|
//! | [`index`] | Key projections of every matchable corpus entry |
//! | [`emotion`] | Emotion label cache and detector |
//! | [`rank`] | Raw scoring, emotion boost, re-sort |
//! | [`orchestrator`] | The per-request stage machine tying the above together |
//! | [`types`] | Outcomes and the debug trace |

pub mod emotion;
pub mod index;
pub mod orchestrator;
pub mod rank;
pub mod types;

use crate::config::MatchingConfig;

pub use emotion::{EmotionDetector, EmotionLabelCache};
pub use index::{IndexReport, KeyIndex, SkipReason, SkippedEntry};
pub use orchestrator::{run_match, MatchContext, MatchStage};
pub use rank::{boost, boost_score, rank, score_index, Ranking, DEFAULT_EMOTION_BOOST};
pub use types::{
    DebugTrace, EmotionDetection, EmotionScore, Fallback, MatchMethod, MatchOutcome, MatchResult,
    NoMatchReason, ScoredEntry,
};

/// Per-request tuning, taken from `[matching]` in the config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    /// Multiplier for entries tagged with the detected emotion. Finite and >= 1.0.
    pub emotion_boost: f32,
    /// Number of ranked candidates kept in the debug trace.
    pub debug_top_n: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            emotion_boost: DEFAULT_EMOTION_BOOST,
            debug_top_n: 5,
        }
    }
}

impl From<&MatchingConfig> for MatchSettings {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            emotion_boost: config.emotion_boost,
            debug_top_n: config.debug_top_n,
        }
    }
}
