//! Request orchestration: prompt, completion, extraction, normalization.

use super::client::{truncate_str, CompletionBackend, HttpCompletionClient};
use super::fallback;
use super::models::{ActionEvent, CommentaryLine, CommentaryStyle, MatchContext};
use super::parse;
use super::prompts;
use super::reconcile::{reconcile, ReconcilePolicy};
use crate::config::ServiceConfig;
use crate::error::Result;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Characters of unparseable model output kept in the warning log
const LOG_PREVIEW_CHARS: usize = 500;

/// Where the returned batch came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentarySource {
    /// Model batch, used as decoded
    Model,
    /// Model batch, padded or trimmed to the input actions
    Reconciled,
    /// Model output was unusable; synthesized from the input
    Fallback,
}

impl fmt::Display for CommentarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CommentarySource::Model => "model",
            CommentarySource::Reconciled => "reconciled",
            CommentarySource::Fallback => "fallback",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCommentary {
    pub request_id: Uuid,
    pub source: CommentarySource,
    pub lines: Vec<CommentaryLine>,
}

/// Commentary generator. Holds no per-request state; clone it or share it
/// behind a reference across tasks.
pub struct CommentaryService<B = HttpCompletionClient> {
    backend: Arc<B>,
    reconcile: ReconcilePolicy,
    default_timeout: Duration,
}

impl<B> Clone for CommentaryService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            reconcile: self.reconcile,
            default_timeout: self.default_timeout,
        }
    }
}

impl<B> fmt::Debug for CommentaryService<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentaryService")
            .field("reconcile", &self.reconcile)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

impl CommentaryService<HttpCompletionClient> {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = HttpCompletionClient::new(config)?;
        Ok(Self::with_backend(client, config))
    }
}

impl<B: CompletionBackend> CommentaryService<B> {
    pub fn with_backend(backend: B, config: &ServiceConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            reconcile: config.reconcile,
            default_timeout: config.timeout,
        }
    }

    /// Timeout from configuration, for callers without their own
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Generate one commentary line per action.
    ///
    /// Transport, status and envelope failures are returned as errors.
    /// Model text that cannot be normalized is not an error: the batch is
    /// synthesized from `events` instead.
    pub async fn generate_commentary(
        &self,
        style: CommentaryStyle,
        context: &MatchContext,
        events: &[ActionEvent],
        timeout: Duration,
    ) -> Result<Vec<CommentaryLine>> {
        self.generate(style, context, events, timeout)
            .await
            .map(|generated| generated.lines)
    }

    /// Like [`Self::generate_commentary`], but also reports the batch source.
    pub async fn generate(
        &self,
        style: CommentaryStyle,
        context: &MatchContext,
        events: &[ActionEvent],
        timeout: Duration,
    ) -> Result<GeneratedCommentary> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "commentary",
            %request_id,
            %style,
            actions = events.len()
        );

        async move {
            let prompt = prompts::assemble(style, context, events);
            debug!(
                system_chars = prompt.system.chars().count(),
                user_chars = prompt.user.chars().count(),
                "prompt assembled"
            );

            let envelope = self.backend.complete(&prompt, timeout).await?;
            let text = envelope.extract_text()?;
            debug!(envelope = envelope.kind(), chars = text.chars().count(), "model text extracted");

            let (lines, source) = match parse::normalize(&text) {
                Ok(lines) => self.finish(events, lines),
                Err(err) => {
                    warn!(
                        error = %err,
                        preview = truncate_str(&text, LOG_PREVIEW_CHARS),
                        "model output unusable, using fallback commentary"
                    );
                    (fallback::synthesize(events), CommentarySource::Fallback)
                }
            };

            info!(lines = lines.len(), %source, "commentary generated");
            Ok(GeneratedCommentary {
                request_id,
                source,
                lines,
            })
        }
        .instrument(span)
        .await
    }

    fn finish(
        &self,
        events: &[ActionEvent],
        lines: Vec<CommentaryLine>,
    ) -> (Vec<CommentaryLine>, CommentarySource) {
        if self.reconcile == ReconcilePolicy::Trust {
            if lines.len() != events.len() {
                warn!(
                    expected = events.len(),
                    received = lines.len(),
                    "model batch size differs from input"
                );
            }
            return (lines, CommentarySource::Model);
        }

        let decoded = lines.clone();
        let result = reconcile(events, lines);
        if result.lines == decoded {
            return (result.lines, CommentarySource::Model);
        }

        warn!(
            matched = result.matched,
            padded = result.padded,
            dropped = result.dropped,
            "model batch reconciled to input actions"
        );
        (result.lines, CommentarySource::Reconciled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commentary::client::tests::{serve_once, test_config};
    use crate::commentary::envelope::CompletionEnvelope;
    use crate::commentary::fallback::FILLER_DESCRIPTION;
    use crate::commentary::models::{Prompt, Tone};
    use crate::error::CommentaryError;
    use serde_json::{json, Value};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// Returns a canned envelope body and records the prompts it was sent.
    struct StubBackend {
        body: Value,
        seen: Mutex<Vec<Prompt>>,
    }

    impl StubBackend {
        fn chat(content: &str) -> Self {
            Self {
                body: json!({"choices": [{"message": {"content": content}}]}),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionBackend for StubBackend {
        fn complete<'a>(
            &'a self,
            prompt: &'a Prompt,
            _timeout: Duration,
        ) -> Pin<Box<dyn Future<Output = Result<CompletionEnvelope>> + Send + 'a>> {
            self.seen.lock().unwrap().push(prompt.clone());
            let body = self.body.clone();
            Box::pin(async move { CompletionEnvelope::from_value(body) })
        }
    }

    fn service(backend: StubBackend, policy: ReconcilePolicy) -> CommentaryService<StubBackend> {
        let config = test_config("http://127.0.0.1:9/v1").with_reconcile(policy);
        CommentaryService::with_backend(backend, &config)
    }

    fn events() -> Vec<ActionEvent> {
        vec![
            serde_json::from_value(json!({
                "actionId": "1", "timeSeconds": 5.0, "typeName": "Pass", "playerNameKo": "Kim"
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "actionId": "2", "timeSeconds": 8.5, "typeName": "Shot", "playerNameKo": "Lee"
            }))
            .unwrap(),
        ]
    }

    fn context() -> MatchContext {
        serde_json::from_value(json!({"gameId": 7, "homeTeamNameKo": "Ulsan"})).unwrap()
    }

    const TWO_LINES: &str = r#"```json
[{"actionId":"1","timeSeconds":"5.0","tone":"CALM","description":"Kim keeps it simple."},
 {"actionId":"2","timeSeconds":"8.5","tone":"EXCITED","description":"Lee shoots!"}]
```"#;

    #[tokio::test]
    async fn test_exact_model_batch() {
        let svc = service(StubBackend::chat(TWO_LINES), ReconcilePolicy::Align);
        let generated = svc
            .generate(CommentaryStyle::Caster, &context(), &events(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(generated.source, CommentarySource::Model);
        assert_eq!(generated.lines.len(), 2);
        assert_eq!(generated.lines[1].tone, Tone::Excited);
        assert_eq!(generated.lines[1].description, "Lee shoots!");
    }

    #[tokio::test]
    async fn test_prompt_reflects_style_and_batch() {
        let svc = service(StubBackend::chat("[]"), ReconcilePolicy::Trust);
        svc.generate_commentary(CommentaryStyle::Analyst, &context(), &events(), Duration::from_secs(1))
            .await
            .unwrap();

        let seen = svc.backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].system,
            prompts::system_prompt(CommentaryStyle::Analyst)
        );
        assert!(seen[0].user.contains("ALL 2 actions"));
        assert!(seen[0].user.contains("Ulsan"));
    }

    #[tokio::test]
    async fn test_unparseable_output_falls_back() {
        let svc = service(StubBackend::chat("I cannot help with that."), ReconcilePolicy::Align);
        let generated = svc
            .generate(CommentaryStyle::Friend, &context(), &events(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(generated.source, CommentarySource::Fallback);
        assert_eq!(generated.lines, fallback::synthesize(&events()));
        assert_eq!(generated.lines[0].description, "Kim plays a Pass.");
    }

    #[tokio::test]
    async fn test_short_batch_is_reconciled() {
        let content = r#"[{"actionId":"2","timeSeconds":"8.5","tone":"EXCITED","description":"Lee shoots!"}]"#;
        let svc = service(StubBackend::chat(content), ReconcilePolicy::Align);
        let generated = svc
            .generate(CommentaryStyle::Caster, &context(), &events(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(generated.source, CommentarySource::Reconciled);
        assert_eq!(generated.lines.len(), 2);
        assert_eq!(generated.lines[0].description, "Kim plays a Pass.");
        assert_eq!(generated.lines[1].description, "Lee shoots!");
    }

    #[tokio::test]
    async fn test_trust_policy_returns_model_batch_as_is() {
        let content = r#"[{"actionId":"99","description":"Ghost line"}]"#;
        let svc = service(StubBackend::chat(content), ReconcilePolicy::Trust);
        let lines = svc
            .generate_commentary(CommentaryStyle::Caster, &context(), &events(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].action_id, "99");
    }

    #[tokio::test]
    async fn test_empty_batch_yields_empty_result() {
        let svc = service(StubBackend::chat("[]"), ReconcilePolicy::Align);
        let generated = svc
            .generate(CommentaryStyle::Caster, &context(), &[], Duration::from_secs(1))
            .await
            .unwrap();
        assert!(generated.lines.is_empty());
        assert_eq!(generated.source, CommentarySource::Model);
    }

    #[tokio::test]
    async fn test_envelope_errors_propagate() {
        let backend = StubBackend {
            body: json!({"error": "model overloaded"}),
            seen: Mutex::new(Vec::new()),
        };
        let svc = service(backend, ReconcilePolicy::Align);
        let err = svc
            .generate(CommentaryStyle::Caster, &context(), &events(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CommentaryError::Upstream(_)));

        let svc = service(StubBackend::chat(""), ReconcilePolicy::Align);
        let err = svc
            .generate(CommentaryStyle::Caster, &context(), &events(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CommentaryError::MalformedEnvelope(_)));
    }

    #[tokio::test]
    async fn test_end_to_end_over_http() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "Sure! [{\"actionId\":\"1\",\"timeSeconds\":\"5.0\",\"description\":\"Kim passes.\"}]"}}]
        })
        .to_string();
        let (url, server) = serve_once("200 OK", body).await;
        let svc = CommentaryService::new(&test_config(&url)).unwrap();

        let generated = svc
            .generate(CommentaryStyle::Caster, &context(), &events(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(generated.source, CommentarySource::Reconciled);
        assert_eq!(generated.lines[0].description, "Kim passes.");
        assert_eq!(generated.lines[1].description, "Lee plays a Shot.");
        assert_ne!(generated.lines[1].description, FILLER_DESCRIPTION);
        server.await.unwrap();
    }

    #[test]
    fn test_service_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<CommentaryService>();
    }
}
