//! Reply envelopes from the completion endpoint.
//!
//! The endpoint's reply shape is not under our control. Every shape we know
//! how to read is an explicit variant; anything else is `Unrecognized` and
//! extraction fails with `MalformedEnvelope` rather than guessing.

use super::aliases::value_text;
use super::client::truncate_str;
use crate::error::{CommentaryError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub tokens: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionEnvelope {
    /// OpenAI chat completion: `{"choices":[{"message":{"content":"..."}}]}`
    Chat { choices: Vec<Choice> },
    /// Text completion: `{"choices":[{"text":"..."}]}`
    Completion { choices: Vec<Choice> },
    /// Bare string output
    Text(String),
    /// Token batches: `[{"choices":[{"tokens":["..."]}], "usage":{...}}]`
    TokenBatches { choices: Vec<Choice> },
    /// Flat object with a `text`, `response` or `content` string
    Fields {
        text: Option<String>,
        response: Option<String>,
        content: Option<String>,
    },
    /// RunPod `/runsync` wrapper: `{"id":..,"status":..,"output":<legacy shape>}`
    RunSync(Box<CompletionEnvelope>),
    Unrecognized(Value),
}

impl CompletionEnvelope {
    /// Decode a raw HTTP body.
    pub fn from_body(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            CommentaryError::MalformedEnvelope(format!(
                "response is not JSON ({}): {}",
                e,
                truncate_str(body, PREVIEW_CHARS)
            ))
        })?;
        Self::from_value(value)
    }

    /// Classify a decoded body. A non-null top-level `error` field is an
    /// `Upstream` error even when the HTTP status was 200.
    pub fn from_value(value: Value) -> Result<Self> {
        if let Some(obj) = value.as_object() {
            if let Some(err) = obj.get("error").filter(|e| !e.is_null()) {
                return Err(CommentaryError::Upstream(upstream_message(err)));
            }
        }
        Ok(classify(value, true))
    }

    /// Pull the generated text out of the envelope.
    pub fn extract_text(&self) -> Result<String> {
        let text = match self {
            CompletionEnvelope::Chat { choices } => {
                let first = choices.first().ok_or_else(|| malformed("response has no choices"))?;
                first
                    .message
                    .as_ref()
                    .and_then(|m| m.content.clone())
                    .unwrap_or_default()
            }
            CompletionEnvelope::Completion { choices } => choices
                .first()
                .and_then(|c| c.text.clone())
                .unwrap_or_default(),
            CompletionEnvelope::Text(text) => text.clone(),
            CompletionEnvelope::TokenBatches { choices } => {
                choices.first().map(legacy_choice_text).unwrap_or_default()
            }
            CompletionEnvelope::Fields {
                text,
                response,
                content,
            } => text
                .as_ref()
                .or(response.as_ref())
                .or(content.as_ref())
                .cloned()
                .unwrap_or_default(),
            CompletionEnvelope::RunSync(inner) => return inner.extract_text(),
            CompletionEnvelope::Unrecognized(value) => {
                let raw = value.to_string();
                return Err(malformed(format!(
                    "unrecognized response shape: {}",
                    truncate_str(&raw, PREVIEW_CHARS)
                )));
            }
        };

        if text.is_empty() {
            return Err(malformed(format!("{} response has empty content", self.kind())));
        }
        Ok(text)
    }

    /// Short variant name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionEnvelope::Chat { .. } => "chat",
            CompletionEnvelope::Completion { .. } => "completion",
            CompletionEnvelope::Text(_) => "text",
            CompletionEnvelope::TokenBatches { .. } => "token_batches",
            CompletionEnvelope::Fields { .. } => "fields",
            CompletionEnvelope::RunSync(_) => "runsync",
            CompletionEnvelope::Unrecognized(_) => "unrecognized",
        }
    }
}

fn malformed(message: impl Into<String>) -> CommentaryError {
    CommentaryError::MalformedEnvelope(message.into())
}

fn classify(value: Value, top_level: bool) -> CompletionEnvelope {
    match value {
        Value::String(text) => CompletionEnvelope::Text(text),
        Value::Array(items) => classify_batches(items),
        Value::Object(obj) => classify_object(obj, top_level),
        other => CompletionEnvelope::Unrecognized(other),
    }
}

fn classify_object(obj: Map<String, Value>, top_level: bool) -> CompletionEnvelope {
    // At the top level `choices` is the primary shape. Inside a legacy
    // `output` wrapper the flat text fields take priority.
    if top_level && obj.contains_key("choices") {
        return classify_choices(obj);
    }
    if top_level {
        if let Some(output) = obj.get("output") {
            return CompletionEnvelope::RunSync(Box::new(classify(output.clone(), false)));
        }
    }

    let field = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
    let (text, response, content) = (field("text"), field("response"), field("content"));
    if text.is_some() || response.is_some() || content.is_some() {
        return CompletionEnvelope::Fields {
            text,
            response,
            content,
        };
    }

    if obj.contains_key("choices") {
        return classify_choices(obj);
    }
    CompletionEnvelope::Unrecognized(Value::Object(obj))
}

fn classify_choices(obj: Map<String, Value>) -> CompletionEnvelope {
    let parsed = match obj.get("choices") {
        Some(Value::Array(items)) => Some(serde_json::from_value::<Vec<Choice>>(Value::Array(
            items.clone(),
        ))),
        _ => None,
    };
    let choices = match parsed {
        Some(Ok(choices)) => choices,
        Some(Err(_)) => return CompletionEnvelope::Unrecognized(Value::Object(obj)),
        // `choices` present but not a list: still the chat shape, extraction reports it
        None => Vec::new(),
    };

    match choices.first() {
        Some(first) if first.message.is_none() && first.text.is_some() => {
            CompletionEnvelope::Completion { choices }
        }
        _ => CompletionEnvelope::Chat { choices },
    }
}

fn classify_batches(items: Vec<Value>) -> CompletionEnvelope {
    let choices = items
        .first()
        .and_then(Value::as_object)
        .and_then(|first| first.get("choices"))
        .and_then(|choices| serde_json::from_value::<Vec<Choice>>(choices.clone()).ok());

    match choices {
        Some(choices) => CompletionEnvelope::TokenBatches { choices },
        None => CompletionEnvelope::Unrecognized(Value::Array(items)),
    }
}

/// tokens (joined) > text > message.content
fn legacy_choice_text(choice: &Choice) -> String {
    if let Some(tokens) = choice.tokens.as_ref().filter(|t| !t.is_empty()) {
        return tokens.iter().map(value_text).collect();
    }
    if let Some(text) = choice.text.as_ref().filter(|t| !t.is_empty()) {
        return text.clone();
    }
    choice
        .message
        .as_ref()
        .and_then(|m| m.content.clone())
        .unwrap_or_default()
}

fn upstream_message(err: &Value) -> String {
    let message = match err {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string()),
        other => other.to_string(),
    };
    truncate_str(&message, PREVIEW_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(value: Value) -> Result<String> {
        CompletionEnvelope::from_value(value)?.extract_text()
    }

    #[test]
    fn test_chat_shape_takes_first_choice() {
        let value = json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "[first]"}},
                {"index": 1, "message": {"role": "assistant", "content": "[second]"}}
            ],
            "usage": {"prompt_tokens": 10}
        });
        let envelope = CompletionEnvelope::from_value(value).unwrap();
        assert_eq!(envelope.kind(), "chat");
        assert_eq!(envelope.extract_text().unwrap(), "[first]");
    }

    #[test]
    fn test_chat_shape_empty_content_is_malformed() {
        let err = extract(json!({"choices": [{"message": {"content": ""}}]})).unwrap_err();
        assert!(matches!(err, CommentaryError::MalformedEnvelope(_)));

        let err = extract(json!({"choices": [{"message": {"content": null}}]})).unwrap_err();
        assert!(matches!(err, CommentaryError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_chat_shape_without_choices_is_malformed() {
        let err = extract(json!({"choices": []})).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn test_error_field_is_upstream_error() {
        let err = extract(json!({"error": {"message": "model overloaded", "code": 503}})).unwrap_err();
        assert!(matches!(err, CommentaryError::Upstream(ref m) if m == "model overloaded"));

        let err = extract(json!({"error": "worker crashed"})).unwrap_err();
        assert!(matches!(err, CommentaryError::Upstream(ref m) if m == "worker crashed"));
    }

    #[test]
    fn test_null_error_field_is_ignored() {
        let text = extract(json!({"error": null, "choices": [{"message": {"content": "ok"}}]}));
        assert_eq!(text.unwrap(), "ok");
    }

    #[test]
    fn test_completion_shape_uses_text() {
        let envelope = CompletionEnvelope::from_value(json!({"choices": [{"text": "[1]"}]})).unwrap();
        assert_eq!(envelope.kind(), "completion");
        assert_eq!(envelope.extract_text().unwrap(), "[1]");
    }

    #[test]
    fn test_runsync_token_batches_are_joined() {
        let value = json!({
            "id": "sync-1",
            "status": "COMPLETED",
            "output": [{"choices": [{"tokens": ["[{\"actionId\":", "\"1\"}]"]}], "usage": {}}]
        });
        let envelope = CompletionEnvelope::from_value(value).unwrap();
        assert_eq!(envelope.kind(), "runsync");
        assert_eq!(envelope.extract_text().unwrap(), "[{\"actionId\":\"1\"}]");
    }

    #[test]
    fn test_runsync_string_output() {
        assert_eq!(extract(json!({"output": "plain"})).unwrap(), "plain");
    }

    #[test]
    fn test_runsync_fields_priority() {
        let text = extract(json!({"output": {"response": "r", "content": "c"}})).unwrap();
        assert_eq!(text, "r");
        let text = extract(json!({"output": {"text": "t", "response": "r"}})).unwrap();
        assert_eq!(text, "t");
    }

    #[test]
    fn test_runsync_nested_choices() {
        let text = extract(json!({"output": {"choices": [{"message": {"content": "m"}}]}})).unwrap();
        assert_eq!(text, "m");
        let text = extract(json!({"output": {"choices": [{"text": "t"}]}})).unwrap();
        assert_eq!(text, "t");
    }

    #[test]
    fn test_token_batch_falls_back_to_text_then_message() {
        assert_eq!(extract(json!([{"choices": [{"text": "txt"}]}])).unwrap(), "txt");
        assert_eq!(
            extract(json!([{"choices": [{"message": {"content": "msg"}}]}])).unwrap(),
            "msg"
        );
    }

    #[test]
    fn test_flat_fields_at_top_level() {
        assert_eq!(extract(json!({"content": "hello"})).unwrap(), "hello");
    }

    #[test]
    fn test_unrecognized_shape_is_malformed_not_stringified() {
        let err = extract(json!({"result": 42})).unwrap_err();
        assert!(err.to_string().contains("unrecognized response shape"));
        assert!(extract(json!(17)).is_err());
        assert!(extract(json!([])).is_err());
    }

    #[test]
    fn test_non_json_body_is_malformed() {
        let err = CompletionEnvelope::from_body("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, CommentaryError::MalformedEnvelope(_)));
    }
}
