//! Two-phase ranking: raw relevance first, then the emotion boost and a re-sort.
//!
//! Both phases sort by score descending and break ties by index position, so equal inputs
//! always produce the same order.

use std::cmp::Ordering;

use crate::corpus::EmotionCategory;
use crate::model::ProjectedVector;

use super::index::KeyIndex;
use super::types::ScoredEntry;

/// Default multiplier for entries tagged with the detected emotion.
pub const DEFAULT_EMOTION_BOOST: f32 = 1.2;

/// Both orderings of one request's candidates.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    /// Finite raw scores, best first.
    pub raw: Vec<ScoredEntry>,
    /// The same entries after boosting, best first.
    pub boosted: Vec<ScoredEntry>,
}

impl Ranking {
    pub fn best(&self) -> Option<&ScoredEntry> {
        self.boosted.first()
    }

    pub fn is_empty(&self) -> bool {
        self.boosted.is_empty()
    }
}

/// Apply the boost so a tagged score never drops below its raw value.
///
/// Non-negative scores are multiplied by `factor`; negative scores are divided by it,
/// moving them toward zero.
pub fn boost_score(raw: f32, factor: f32) -> f32 {
    if raw >= 0.0 {
        raw * factor
    } else {
        raw / factor
    }
}

/// Score `query` against every indexed key. Non-finite scores are dropped.
pub fn score_index(query: &ProjectedVector, index: &KeyIndex) -> Vec<ScoredEntry> {
    let scored = index
        .iter()
        .enumerate()
        .filter_map(|(position, (id, key))| {
            let raw = query.dot(key);
            if raw.is_finite() {
                Some(ScoredEntry {
                    id: id.to_string(),
                    position,
                    raw,
                    boosted: raw,
                    is_boosted: false,
                })
            } else {
                tracing::warn!(id = %id, "dropping non-finite score");
                None
            }
        })
        .collect();
    sort_raw(scored)
}

/// Rank precomputed `(id, score)` pairs. Input order is the tie-break.
#[cfg(test)]
fn rank_scores(scores: Vec<(String, f32)>) -> Vec<ScoredEntry> {
    let scored = scores
        .into_iter()
        .enumerate()
        .filter(|(_, (_, raw))| raw.is_finite())
        .map(|(position, (id, raw))| ScoredEntry {
            id,
            position,
            raw,
            boosted: raw,
            is_boosted: false,
        })
        .collect();
    sort_raw(scored)
}

/// Boost entries whose tag equals `emotion`, then re-sort by boosted score.
///
/// With no emotion every entry keeps its raw score and the order is unchanged.
pub fn boost<F>(
    ranked: Vec<ScoredEntry>,
    emotion: Option<EmotionCategory>,
    tag_of: F,
    factor: f32,
) -> Vec<ScoredEntry>
where
    F: Fn(&str) -> Option<EmotionCategory>,
{
    let mut boosted: Vec<ScoredEntry> = ranked
        .into_iter()
        .map(|mut e| {
            let tagged = emotion.is_some() && tag_of(&e.id) == emotion;
            e.boosted = if tagged { boost_score(e.raw, factor) } else { e.raw };
            e.is_boosted = tagged;
            e
        })
        .collect();
    boosted.sort_by(|a, b| by_score_then_position(a.boosted, a.position, b.boosted, b.position));
    boosted
}

/// Run both phases.
pub fn rank<F>(
    query: &ProjectedVector,
    index: &KeyIndex,
    emotion: Option<EmotionCategory>,
    tag_of: F,
    factor: f32,
) -> Ranking
where
    F: Fn(&str) -> Option<EmotionCategory>,
{
    let raw = score_index(query, index);
    let boosted = boost(raw.clone(), emotion, tag_of, factor);
    Ranking { raw, boosted }
}

fn sort_raw(mut scored: Vec<ScoredEntry>) -> Vec<ScoredEntry> {
    scored.sort_by(|a, b| by_score_then_position(a.raw, a.position, b.raw, b.position));
    scored
}

fn by_score_then_position(a: f32, a_pos: usize, b: f32, b_pos: usize) -> Ordering {
    b.partial_cmp(&a)
        .unwrap_or(Ordering::Equal)
        .then(a_pos.cmp(&b_pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PROJ_DIM;

    fn tags(id: &str) -> Option<EmotionCategory> {
        match id {
            "grief-verse" => Some(EmotionCategory::Grief),
            "anger-verse" => Some(EmotionCategory::Anger),
            _ => None,
        }
    }

    #[test]
    fn boost_reverses_close_scores() {
        let ranked = rank_scores(vec![
            ("plain".into(), 0.55),
            ("grief-verse".into(), 0.50),
        ]);
        assert_eq!(ranked[0].id, "plain");

        let boosted = boost(ranked, Some(EmotionCategory::Grief), tags, DEFAULT_EMOTION_BOOST);
        assert_eq!(boosted[0].id, "grief-verse");
        assert!((boosted[0].boosted - 0.60).abs() < 1e-6);
        assert!(boosted[0].is_boosted);
        assert_eq!(boosted[0].raw, 0.50);
        assert_eq!(boosted[1].boosted, 0.55);
        assert!(!boosted[1].is_boosted);
    }

    #[test]
    fn no_emotion_keeps_raw_order() {
        let ranked = rank_scores(vec![
            ("grief-verse".into(), 0.1),
            ("plain".into(), 0.9),
            ("anger-verse".into(), 0.5),
        ]);
        let boosted = boost(ranked.clone(), None, tags, DEFAULT_EMOTION_BOOST);
        assert_eq!(boosted, ranked);
        assert!(boosted.iter().all(|e| !e.is_boosted && e.boosted == e.raw));
    }

    #[test]
    fn ties_break_by_position() {
        let ranked = rank_scores(vec![
            ("a".into(), 0.3),
            ("b".into(), 0.7),
            ("c".into(), 0.3),
            ("d".into(), 0.7),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn non_finite_scores_are_excluded() {
        let ranked = rank_scores(vec![
            ("nan".into(), f32::NAN),
            ("ok".into(), -0.2),
            ("inf".into(), f32::INFINITY),
        ]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "ok");
    }

    #[test]
    fn boost_never_lowers_a_score() {
        for raw in [-2.0f32, -0.5, 0.0, 0.3, 4.0] {
            assert!(boost_score(raw, 1.2) >= raw, "raw {raw}");
            assert_eq!(boost_score(raw, 1.0), raw);
        }
        assert!((boost_score(-0.6, 1.2) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_key_scores_zero_and_can_win() {
        let mut neg = vec![0.0f32; PROJ_DIM];
        neg[0] = -1.0;
        let index = KeyIndex::from_projected(vec![
            ("negative".into(), ProjectedVector::from_vec(neg).unwrap()),
            ("zero".into(), ProjectedVector::zeros()),
        ]);
        let mut q = vec![0.0f32; PROJ_DIM];
        q[0] = 1.0;
        let q = ProjectedVector::from_vec(q).unwrap();

        let ranking = rank(&q, &index, None, tags, DEFAULT_EMOTION_BOOST);
        let best = ranking.best().unwrap();
        assert_eq!(best.id, "zero");
        assert_eq!(best.raw, 0.0);
        assert_eq!(ranking.raw[1].position, 0);
    }

    #[test]
    fn ranking_is_deterministic() {
        let index = KeyIndex::from_projected(
            (0..20)
                .map(|i| {
                    let mut v = vec![0.0f32; PROJ_DIM];
                    v[i % 4] = (i % 3) as f32;
                    (format!("e{i}"), ProjectedVector::from_vec(v).unwrap())
                })
                .collect(),
        );
        let q = ProjectedVector::from_vec(vec![1.0; PROJ_DIM]).unwrap();
        let first = rank(&q, &index, Some(EmotionCategory::Grief), tags, 1.2);
        for _ in 0..5 {
            let again = rank(&q, &index, Some(EmotionCategory::Grief), tags, 1.2);
            assert_eq!(again.boosted, first.boosted);
        }
    }
}
