use crate::error::{EmbeddingError, Result};
use crate::limiter::RequestPacer;
use crate::provider::{EmbeddingBatch, EmbeddingProvider};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::usage::{UsageSnapshot, UsageTracker};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::ops::Range;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.voyageai.com/v1/embeddings";
pub const DEFAULT_MODEL: &str = "voyage-code-3";
pub const DEFAULT_DIMENSIONS: usize = 1024;
pub const MAX_BATCH_SIZE: usize = 128;
// Provider ceiling is 120k tokens per batch; stay under it.
pub const MAX_BATCH_TOKENS: usize = 100_000;

const INPUT_TYPE_DOCUMENT: &str = "document";
const INPUT_TYPE_QUERY: &str = "query";

/// Connection settings for the remote embedding API.
#[derive(Debug, Clone)]
pub struct RemoteEmbeddingConfig {
    pub endpoint: String,
    pub model: String,
    pub dimensions: usize,
    /// Bearer credential. `None` surfaces `MissingCredential` on first use
    /// so credential-free operations (status reads) still work.
    pub api_key: Option<String>,
    pub max_batch_size: usize,
    pub max_batch_tokens: usize,
    pub requests_per_minute: u32,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for RemoteEmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            api_key: None,
            max_batch_size: MAX_BATCH_SIZE,
            max_batch_tokens: MAX_BATCH_TOKENS,
            requests_per_minute: 300,
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl RemoteEmbeddingConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        // A blank primary key must not mask the fallback one.
        let key = |name: &str| lookup(name).filter(|key| !key.trim().is_empty());
        config.api_key = key("CODESCOUT_API_KEY").or_else(|| key("VOYAGE_API_KEY"));
        if let Some(endpoint) = lookup("CODESCOUT_EMBED_URL") {
            if !endpoint.trim().is_empty() {
                config.endpoint = endpoint;
            }
        }
        if let Some(model) = lookup("CODESCOUT_EMBED_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        config
    }
}

/// HTTP client for a rate-limited embedding provider.
///
/// Batches are capped by text count and estimated tokens, each request is
/// paced through a shared limiter, and transient failures retry with
/// exponential backoff before surfacing as permanent.
pub struct RemoteEmbeddingClient {
    http: reqwest::Client,
    config: RemoteEmbeddingConfig,
    pacer: RequestPacer,
    usage: UsageTracker,
}

impl RemoteEmbeddingClient {
    pub fn new(config: RemoteEmbeddingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| EmbeddingError::Permanent(format!("http client setup failed: {err}")))?;
        let pacer = RequestPacer::new(config.requests_per_minute);
        Ok(Self {
            http,
            config,
            pacer,
            usage: UsageTracker::new(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(RemoteEmbeddingConfig::from_env())
    }

    async fn embed_texts(&self, texts: &[String], input_type: &str) -> Result<(Vec<Vec<f32>>, u64)> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(EmbeddingError::MissingCredential);
        };
        retry_with_backoff(&self.config.retry, "embedding request", |_| {
            self.send_once(api_key, texts, input_type)
        })
        .await
    }

    async fn send_once(
        &self,
        api_key: &str,
        texts: &[String],
        input_type: &str,
    ) -> Result<(Vec<Vec<f32>>, u64)> {
        self.pacer.acquire().await;

        let body = EmbedRequestBody {
            input: texts,
            model: &self.config.model,
            input_type,
        };
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(0);
            return Err(EmbeddingError::RateLimited(retry_after));
        }
        if !status.is_success() {
            let detail = summarize_body(&response.text().await.unwrap_or_default());
            return Err(classify_status(status, detail));
        }

        let parsed: EmbedResponseBody = response
            .json()
            .await
            .map_err(|err| EmbeddingError::InvalidResponse(err.to_string()))?;
        let embeddings = collect_ordered_embeddings(parsed.data, texts.len())?;
        Ok((embeddings, parsed.usage.total_tokens))
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingClient {
    async fn embed_documents(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        if texts.is_empty() {
            return Ok(EmbeddingBatch::empty());
        }

        let ranges =
            token_aware_batches(texts, self.config.max_batch_size, self.config.max_batch_tokens);
        log::debug!(
            "embedding {} documents in {} batch(es)",
            texts.len(),
            ranges.len()
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        let mut total_tokens = 0u64;
        for range in ranges {
            let (batch_vectors, batch_tokens) = self
                .embed_texts(&texts[range], INPUT_TYPE_DOCUMENT)
                .await?;
            embeddings.extend(batch_vectors);
            total_tokens += batch_tokens;
        }

        self.usage.record(total_tokens);
        let snapshot = self.usage.snapshot();
        log::debug!(
            "embedded {} documents, {} tokens (cumulative {} tokens, ~${:.4})",
            texts.len(),
            total_tokens,
            snapshot.total_tokens,
            snapshot.estimated_cost_usd
        );

        Ok(EmbeddingBatch {
            embeddings,
            total_tokens,
        })
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let owned = [text.to_string()];
        let (mut embeddings, tokens) = self.embed_texts(&owned, INPUT_TYPE_QUERY).await?;
        self.usage.record(tokens);
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty query embedding".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn usage(&self) -> UsageSnapshot {
        self.usage.snapshot()
    }
}

#[derive(Serialize)]
struct EmbedRequestBody<'a> {
    input: &'a [String],
    model: &'a str,
    input_type: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponseBody {
    data: Vec<EmbedResponseItem>,
    usage: EmbedResponseUsage,
}

#[derive(Deserialize)]
struct EmbedResponseItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponseUsage {
    total_tokens: u64,
}

/// Rough token estimate for code: ~4 characters per token.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Split `texts` into contiguous ranges bounded by count and token budget.
///
/// A single text over the token budget still gets its own batch; the
/// provider is the final arbiter of per-item limits.
#[must_use]
pub fn token_aware_batches(
    texts: &[String],
    max_batch_size: usize,
    max_batch_tokens: usize,
) -> Vec<Range<usize>> {
    let max_batch_size = max_batch_size.max(1);
    let mut batches = Vec::new();
    let mut start = 0usize;
    let mut count = 0usize;
    let mut tokens = 0usize;

    for (i, text) in texts.iter().enumerate() {
        let estimate = estimate_tokens(text);
        if count > 0 && (count >= max_batch_size || tokens + estimate > max_batch_tokens) {
            batches.push(start..i);
            start = i;
            count = 0;
            tokens = 0;
        }
        count += 1;
        tokens += estimate;
    }
    if count > 0 {
        batches.push(start..texts.len());
    }
    batches
}

fn collect_ordered_embeddings(
    mut data: Vec<EmbedResponseItem>,
    expected: usize,
) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {expected} embeddings, provider returned {}",
            data.len()
        )));
    }
    data.sort_by_key(|item| item.index);
    Ok(data.into_iter().map(|item| item.embedding).collect())
}

fn classify_transport_error(err: reqwest::Error) -> EmbeddingError {
    if err.is_timeout() {
        EmbeddingError::Transient("request timed out".to_string())
    } else if err.is_connect() {
        EmbeddingError::Transient(format!("connection failed: {err}"))
    } else if err.is_builder() {
        EmbeddingError::Permanent(format!("malformed request: {err}"))
    } else {
        EmbeddingError::Transient(err.to_string())
    }
}

fn classify_status(status: reqwest::StatusCode, detail: String) -> EmbeddingError {
    if status.is_server_error() || status == reqwest::StatusCode::REQUEST_TIMEOUT {
        EmbeddingError::Transient(format!("HTTP {status}: {detail}"))
    } else if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
    {
        EmbeddingError::Permanent(format!(
            "HTTP {status}: credential rejected by provider ({detail})"
        ))
    } else {
        EmbeddingError::Permanent(format!("HTTP {status}: {detail}"))
    }
}

fn summarize_body(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    if trimmed.len() <= MAX {
        trimmed.to_string()
    } else {
        let mut cut = MAX;
        while !trimmed.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…", &trimmed[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(sizes: &[usize]) -> Vec<String> {
        sizes.iter().map(|n| "x".repeat(*n)).collect()
    }

    #[test]
    fn batches_split_at_count_cap() {
        let input = texts(&[4; 5]);
        let ranges = token_aware_batches(&input, 2, 1_000_000);
        assert_eq!(ranges, vec![0..2, 2..4, 4..5]);
    }

    #[test]
    fn batches_split_at_token_budget() {
        // 100 tokens each, budget 250 => 2 + 1
        let input = texts(&[400, 400, 400]);
        let ranges = token_aware_batches(&input, 128, 250);
        assert_eq!(ranges, vec![0..2, 2..3]);
    }

    #[test]
    fn oversized_text_gets_its_own_batch() {
        let input = texts(&[4000, 8]);
        let ranges = token_aware_batches(&input, 128, 100);
        assert_eq!(ranges, vec![0..1, 1..2]);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        let ranges = token_aware_batches(&[], 128, 100_000);
        assert!(ranges.is_empty());
    }

    #[test]
    fn ordered_collection_sorts_by_provider_index() {
        let data = vec![
            EmbedResponseItem {
                index: 1,
                embedding: vec![1.0],
            },
            EmbedResponseItem {
                index: 0,
                embedding: vec![0.0],
            },
        ];
        let ordered = collect_ordered_embeddings(data, 2).unwrap();
        assert_eq!(ordered, vec![vec![0.0], vec![1.0]]);
    }

    #[test]
    fn ordered_collection_rejects_wrong_cardinality() {
        let data = vec![EmbedResponseItem {
            index: 0,
            embedding: vec![0.0],
        }];
        let err = collect_ordered_embeddings(data, 2).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    }

    #[test]
    fn config_lookup_prefers_codescout_key() {
        let config = RemoteEmbeddingConfig::from_lookup(|key| match key {
            "CODESCOUT_API_KEY" => Some("primary".to_string()),
            "VOYAGE_API_KEY" => Some("fallback".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("primary"));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn config_lookup_falls_back_and_ignores_blank() {
        let config = RemoteEmbeddingConfig::from_lookup(|key| match key {
            "CODESCOUT_API_KEY" => Some("   ".to_string()),
            "VOYAGE_API_KEY" => Some("fallback".to_string()),
            "CODESCOUT_EMBED_MODEL" => Some("voyage-3".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("fallback"));
        assert_eq!(config.model, "voyage-3");
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let client = RemoteEmbeddingClient::new(RemoteEmbeddingConfig {
            api_key: None,
            // unroutable endpoint: proves nothing is sent
            endpoint: "http://127.0.0.1:1/v1/embeddings".to_string(),
            ..RemoteEmbeddingConfig::default()
        })
        .unwrap();

        let err = client.embed_query("needle").await.unwrap_err();
        assert_eq!(err, EmbeddingError::MissingCredential);
        let err = client
            .embed_documents(&["a".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err, EmbeddingError::MissingCredential);
    }

    #[test]
    fn body_summary_truncates_long_payloads() {
        let long = "e".repeat(500);
        let summary = summarize_body(&long);
        assert!(summary.len() <= 203);
        assert!(summary.ends_with('…'));
    }
}
