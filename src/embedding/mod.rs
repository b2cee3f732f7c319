//! External text providers: embeddings and query understanding.
//!
//! Provides the [`EmbeddingProvider`] and [`UnderstandingProvider`] traits, an OpenAI-compatible
//! implementation of both, and [`ProviderSet`], the two-variant capability the engine selects
//! from configuration via [`create_providers`].

pub mod openai;
pub mod usage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

pub use usage::UsageTracker;

/// Trait for embedding text into raw vectors.
///
/// Implementations should return [`INPUT_DIM`](crate::model::INPUT_DIM)-wide vectors; the
/// encoder rejects anything else.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Identifier of the model producing the vectors.
    fn model(&self) -> &str;
}

/// Paraphrases a user statement into text that matches the corpus better.
#[async_trait]
pub trait UnderstandingProvider: Send + Sync {
    async fn understand(&self, text: &str) -> Result<QueryUnderstanding, ProviderError>;
}

/// Structured reading of a user query. Purely advisory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryUnderstanding {
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub enhanced_query: String,
}

/// Which providers a request may use. Chosen once from config, never changed mid-request.
#[derive(Clone)]
pub enum ProviderSet {
    External {
        embedding: Arc<dyn EmbeddingProvider>,
        /// `None` when paraphrasing is disabled.
        understanding: Option<Arc<dyn UnderstandingProvider>>,
    },
    Offline,
}

impl ProviderSet {
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }

    pub fn embedding(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        match self {
            Self::External { embedding, .. } => Some(embedding),
            Self::Offline => None,
        }
    }

    pub fn understanding(&self) -> Option<&Arc<dyn UnderstandingProvider>> {
        match self {
            Self::External { understanding, .. } => understanding.as_ref(),
            Self::Offline => None,
        }
    }
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::External {
                embedding,
                understanding,
            } => f
                .debug_struct("External")
                .field("embedding_model", &embedding.model())
                .field("understanding", &understanding.is_some())
                .finish(),
            Self::Offline => f.write_str("Offline"),
        }
    }
}

/// Create the provider set from config.
///
/// `"none"` and a missing API key both yield [`ProviderSet::Offline`].
pub fn create_providers(
    config: &ProviderConfig,
    usage: Arc<UsageTracker>,
) -> anyhow::Result<ProviderSet> {
    match config.kind.as_str() {
        "none" => Ok(ProviderSet::Offline),
        "openai" => {
            if config.api_key.trim().is_empty() {
                tracing::warn!("no OpenAI API key configured, running without providers");
                return Ok(ProviderSet::Offline);
            }
            let client = Arc::new(openai::OpenAiClient::new(config, usage)?);
            let understanding: Option<Arc<dyn UnderstandingProvider>> = if config.paraphrase {
                Some(client.clone() as Arc<dyn UnderstandingProvider>)
            } else {
                None
            };
            tracing::info!(
                embedding_model = %config.embedding_model,
                paraphrase = config.paraphrase,
                "external providers ready"
            );
            Ok(ProviderSet::External {
                embedding: client,
                understanding,
            })
        }
        other => anyhow::bail!("unknown provider kind: {other}. Supported: openai, none"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_kind_is_offline() {
        let config = ProviderConfig {
            kind: "none".into(),
            ..ProviderConfig::default()
        };
        let set = create_providers(&config, Arc::new(UsageTracker::new())).unwrap();
        assert!(set.is_offline());
        assert!(set.embedding().is_none());
        assert!(set.understanding().is_none());
    }

    #[test]
    fn missing_key_is_offline() {
        let config = ProviderConfig {
            api_key: "  ".into(),
            ..ProviderConfig::default()
        };
        let set = create_providers(&config, Arc::new(UsageTracker::new())).unwrap();
        assert!(set.is_offline());
    }

    #[test]
    fn openai_with_key_is_external() {
        let config = ProviderConfig {
            api_key: "sk-test".into(),
            paraphrase: false,
            ..ProviderConfig::default()
        };
        let set = create_providers(&config, Arc::new(UsageTracker::new())).unwrap();
        assert_eq!(set.embedding().unwrap().model(), "text-embedding-3-small");
        assert!(set.understanding().is_none());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let config = ProviderConfig {
            kind: "mystery".into(),
            ..ProviderConfig::default()
        };
        assert!(create_providers(&config, Arc::new(UsageTracker::new())).is_err());
    }

    #[test]
    fn understanding_tolerates_missing_fields() {
        let u: QueryUnderstanding =
            serde_json::from_str(r#"{"enhanced_query": "seeking steadiness"}"#).unwrap();
        assert_eq!(u.enhanced_query, "seeking steadiness");
        assert!(u.emotions.is_empty());
    }
}
