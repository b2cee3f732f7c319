//! The closed set of emotion categories verses are tagged with.

use serde::{Deserialize, Serialize};

/// One of the eleven emotion labels. Declaration order is the detector's tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EmotionCategory {
    Anxiety,
    Grief,
    Anger,
    Attachment,
    Burnout,
    #[serde(rename = "Identity Crisis")]
    IdentityCrisis,
    #[serde(rename = "Intellectual Doubt")]
    IntellectualDoubt,
    Loneliness,
    #[serde(rename = "Moral Dilemma")]
    MoralDilemma,
    Pride,
    #[serde(rename = "Result-Obsession")]
    ResultObsession,
}

impl EmotionCategory {
    /// Every label, in fixed enumeration order.
    pub const ALL: [EmotionCategory; 11] = [
        Self::Anxiety,
        Self::Grief,
        Self::Anger,
        Self::Attachment,
        Self::Burnout,
        Self::IdentityCrisis,
        Self::IntellectualDoubt,
        Self::Loneliness,
        Self::MoralDilemma,
        Self::Pride,
        Self::ResultObsession,
    ];

    /// Display label. This exact text is what gets embedded for the label vector.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anxiety => "Anxiety",
            Self::Grief => "Grief",
            Self::Anger => "Anger",
            Self::Attachment => "Attachment",
            Self::Burnout => "Burnout",
            Self::IdentityCrisis => "Identity Crisis",
            Self::IntellectualDoubt => "Intellectual Doubt",
            Self::Loneliness => "Loneliness",
            Self::MoralDilemma => "Moral Dilemma",
            Self::Pride => "Pride",
            Self::ResultObsession => "Result-Obsession",
        }
    }
}

impl std::fmt::Display for EmotionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmotionCategory {
    type Err = String;

    /// Case-insensitive; `-`, `_` and spaces are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|e| normalize(e.as_str()) == wanted)
            .ok_or_else(|| format!("unknown emotion category: {s}"))
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '-' | '_' => ' ',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_loosely() {
        assert_eq!("Grief".parse::<EmotionCategory>().unwrap(), EmotionCategory::Grief);
        assert_eq!(
            "result_obsession".parse::<EmotionCategory>().unwrap(),
            EmotionCategory::ResultObsession
        );
        assert_eq!(
            " identity-crisis ".parse::<EmotionCategory>().unwrap(),
            EmotionCategory::IdentityCrisis
        );
        assert!("Joy".parse::<EmotionCategory>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for e in EmotionCategory::ALL {
            assert_eq!(e.to_string().parse::<EmotionCategory>().unwrap(), e);
        }
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&EmotionCategory::MoralDilemma).unwrap();
        assert_eq!(json, "\"Moral Dilemma\"");
        let back: EmotionCategory = serde_json::from_str("\"Result-Obsession\"").unwrap();
        assert_eq!(back, EmotionCategory::ResultObsession);
    }

    #[test]
    fn enumeration_order_is_fixed() {
        assert_eq!(EmotionCategory::ALL[0], EmotionCategory::Anxiety);
        assert_eq!(EmotionCategory::ALL[10], EmotionCategory::ResultObsession);
        let mut sorted = EmotionCategory::ALL;
        sorted.sort();
        assert_eq!(sorted, EmotionCategory::ALL);
    }
}
