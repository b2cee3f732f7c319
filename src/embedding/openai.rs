//! OpenAI-compatible HTTP client for embeddings and chat-based query understanding.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use super::{EmbeddingProvider, QueryUnderstanding, UnderstandingProvider, UsageTracker};
use crate::config::ProviderConfig;
use crate::corpus::EmotionCategory;
use crate::error::ProviderError;

/// Async client shared by the embedding and understanding paths.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    embedding_model: String,
    chat_model: String,
    max_retries: usize,
    usage: Arc<UsageTracker>,
}

impl OpenAiClient {
    pub fn new(config: &ProviderConfig, usage: Arc<UsageTracker>) -> anyhow::Result<Self> {
        anyhow::ensure!(!config.api_key.trim().is_empty(), "missing OpenAI API key");
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", config.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid OpenAI API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .context("failed to build OpenAI HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            max_retries: config.max_retries.max(1),
            usage,
        })
    }

    /// POST `body` to `{base_url}/{path}`, retrying rate limits, server errors and transport
    /// failures with exponential backoff.
    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut attempt = 0usize;
        loop {
            match self.client.post(&url).json(body).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json::<T>().await.map_err(ProviderError::from);
                    }
                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::debug!(status = %status, attempt, "retrying provider request");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(ProviderError::Status {
                        status: status.as_u16(),
                        body: body.chars().take(200).collect(),
                    });
                }
                Err(err) => {
                    if is_retryable(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::debug!(error = %err, attempt, "retrying provider request");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyPayload);
        }
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let parsed: EmbeddingResponse = self.post_json("embeddings", &request).await?;

        if let Some(usage) = parsed.usage {
            self.usage.record(
                &self.embedding_model,
                usage.prompt_tokens.unwrap_or(0),
                0,
                usage.total_tokens,
            );
        }

        let embedding = parsed
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .unwrap_or_default();
        if embedding.is_empty() {
            return Err(ProviderError::EmptyPayload);
        }
        Ok(embedding)
    }

    fn model(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl UnderstandingProvider for OpenAiClient {
    async fn understand(&self, text: &str) -> Result<QueryUnderstanding, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyPayload);
        }
        let system = system_prompt();
        let user = format!(
            "User statement: \"{text}\"\n\nDescribe what they feel, what they face, and what \
             guidance would help. Respond only with the JSON object."
        );
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.7,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let parsed: ChatResponse = self.post_json("chat/completions", &request).await?;

        if let Some(usage) = parsed.usage {
            self.usage.record(
                &self.chat_model,
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens,
            );
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ProviderError::EmptyPayload)?;
        parse_understanding(&content)
    }
}

/// Parse the model's JSON answer. A blank `enhanced_query` counts as an empty payload.
pub fn parse_understanding(content: &str) -> Result<QueryUnderstanding, ProviderError> {
    let understanding: QueryUnderstanding =
        serde_json::from_str(content).map_err(|e| ProviderError::Decode(e.to_string()))?;
    if understanding.enhanced_query.trim().is_empty() {
        return Err(ProviderError::EmptyPayload);
    }
    Ok(understanding)
}

fn system_prompt() -> String {
    let labels: Vec<&str> = EmotionCategory::ALL.iter().map(|e| e.as_str()).collect();
    format!(
        "You read short personal statements and restate them so they can be matched against \
         verses of the Bhagavad Gita. Identify the one or two strongest emotions, the \
         circumstances, and the guidance being sought.\n\n\
         Reply with a JSON object:\n\
         {{\"emotions\": [..], \"themes\": [..], \"intent\": \"..\", \"enhanced_query\": \"..\"}}\n\n\
         `emotions` must use only these labels, spelled exactly: {}.\n\
         `enhanced_query` is two or three sentences restating the situation in the language of \
         duty, attachment, equanimity and the self, so it sits close to relevant verses.",
        labels.join(", ")
    )
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(250 * (1 << capped))
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_understanding_accepts_full_answer() {
        let u = parse_understanding(
            r#"{"emotions": ["Anxiety"], "themes": ["exams"], "intent": "calm",
                "enhanced_query": "Fear of failing clouds the mind before duty."}"#,
        )
        .unwrap();
        assert_eq!(u.emotions, vec!["Anxiety"]);
        assert!(u.enhanced_query.starts_with("Fear"));
    }

    #[test]
    fn parse_understanding_rejects_blank_or_invalid() {
        assert!(matches!(
            parse_understanding(r#"{"emotions": [], "enhanced_query": "  "}"#),
            Err(ProviderError::EmptyPayload)
        ));
        assert!(matches!(
            parse_understanding("not json"),
            Err(ProviderError::Decode(_))
        ));
    }

    #[test]
    fn prompt_lists_every_label() {
        let prompt = system_prompt();
        for e in EmotionCategory::ALL {
            assert!(prompt.contains(e.as_str()), "missing {e}");
        }
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(retry_backoff(1), Duration::from_millis(500));
        assert_eq!(retry_backoff(5), retry_backoff(50));
        assert!(should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry(StatusCode::BAD_GATEWAY));
        assert!(!should_retry(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn embedding_response_tolerates_extra_fields() {
        let parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"object": "list", "data": [{"object": "embedding", "index": 0, "embedding": [0.5, -0.5]}],
                "usage": {"prompt_tokens": 4, "total_tokens": 4}}"#,
        )
        .unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.5, -0.5]);
        assert_eq!(parsed.usage.unwrap().total_tokens, Some(4));
    }

    #[tokio::test]
    #[ignore] // Requires OPENAI_API_KEY and network. Run with: cargo test -- --ignored
    async fn live_embedding_is_1536_dims() {
        let config = ProviderConfig {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            ..ProviderConfig::default()
        };
        let client = OpenAiClient::new(&config, Arc::new(UsageTracker::new())).unwrap();
        let v = client.embed("I feel anxious about my exams").await.unwrap();
        assert_eq!(v.len(), crate::model::INPUT_DIM);
    }
}
