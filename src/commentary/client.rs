use super::envelope::CompletionEnvelope;
use super::models::{Prompt, MAX_TOKENS, TEMPERATURE, TOP_P};
use crate::config::ServiceConfig;
use crate::error::{CommentaryError, Result};
use reqwest::StatusCode;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// Maximum length for error content in error messages
const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Sanitize API response content for error messages to prevent credential leakage.
fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &["api_key", "apikey", "secret", "password", "bearer"];

    let truncated = truncate_str(content, MAX_ERROR_CONTENT_LEN);
    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|p| lower.contains(p)) {
        return "(response details redacted - may contain sensitive data)".to_string();
    }
    truncated.to_string()
}

/// Truncate a string for display (Unicode-safe)
pub(crate) fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Something that can turn a prompt into a completion envelope.
///
/// The HTTP client is the production implementation; the service only sees
/// this trait.
pub trait CompletionBackend: Send + Sync {
    fn complete<'a>(
        &'a self,
        prompt: &'a Prompt,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionEnvelope>> + Send + 'a>>;
}

/// Chat-completion client for an OpenAI-compatible endpoint
#[derive(Clone)]
pub struct HttpCompletionClient {
    http: reqwest::Client,
    endpoint: url::Url,
    api_key: String,
    model: String,
}

impl fmt::Debug for HttpCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCompletionClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl HttpCompletionClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CommentaryError::Configuration(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: config.endpoint_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Send one non-streaming chat request. `limit` bounds the whole round
    /// trip, body included. No retries.
    pub async fn invoke(&self, prompt: &Prompt, limit: Duration) -> Result<CompletionEnvelope> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            stream: false,
        };

        let started = Instant::now();
        let round_trip = async {
            let response = self
                .http
                .post(self.endpoint.clone())
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request)
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, CommentaryError>((status, text))
        };

        let (status, text) = timeout(limit, round_trip)
            .await
            .map_err(|_| CommentaryError::timeout(limit))??;

        debug!(
            status = status.as_u16(),
            bytes = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "completion endpoint responded"
        );

        if status != StatusCode::OK {
            return Err(CommentaryError::Endpoint {
                status: status.as_u16(),
                body: sanitize_api_response(&text),
            });
        }

        CompletionEnvelope::from_body(&text)
    }
}

impl CompletionBackend for HttpCompletionClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a Prompt,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionEnvelope>> + Send + 'a>> {
        Box::pin(self.invoke(prompt, timeout))
    }
}
