use super::aliases::value_text;
use super::models::{CommentaryLine, Tone};
use serde_json::{Map, Value};

/// Model output that could not be turned into commentary lines.
///
/// Recoverable: the service answers with the fallback batch instead.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("expected a JSON array, found {0}")]
    NotAnArray(&'static str),
    #[error("array element {index} is not an object")]
    NotAnObject { index: usize },
}

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Content of the first fence pair opened by `open`, if it has a closing fence.
fn fenced_block<'a>(text: &'a str, open: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = start + text[start..].find(FENCE)?;
    if end > start {
        Some(text[start..end].trim())
    } else {
        None
    }
}

/// Narrow free-form model text down to the JSON array it (probably) contains.
///
/// Fences are unwrapped first, then any prose before the first `[` and after
/// the last `]` is cut.
pub(crate) fn extract_json_array(response: &str) -> &str {
    let mut text = response.trim();

    if text.contains(JSON_FENCE) {
        if let Some(block) = fenced_block(text, JSON_FENCE) {
            text = block;
        }
    } else if text.contains(FENCE) {
        if let Some(block) = fenced_block(text, FENCE) {
            text = block;
        }
    }

    if !text.starts_with('[') {
        if let Some(start) = text.find('[') {
            text = &text[start..];
        }
    }
    if !text.ends_with(']') {
        if let Some(end) = text.rfind(']') {
            text = &text[..=end];
        }
    }
    text
}

/// Turn model text into commentary lines.
///
/// No cardinality check happens here; see [`super::reconcile`].
pub fn normalize(response: &str) -> Result<Vec<CommentaryLine>, ParseError> {
    let candidate = extract_json_array(response);
    let value: Value = serde_json::from_str(candidate)?;

    let items = match value {
        Value::Array(items) => items,
        other => return Err(ParseError::NotAnArray(json_kind(&other))),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_object()
                .map(line_from_object)
                .ok_or(ParseError::NotAnObject { index })
        })
        .collect()
}

fn line_from_object(obj: &Map<String, Value>) -> CommentaryLine {
    let text = |key: &str| obj.get(key).map(value_text).unwrap_or_default();
    let tone = obj
        .get("tone")
        .and_then(Value::as_str)
        .and_then(Tone::parse_lenient)
        .unwrap_or_default();

    CommentaryLine {
        action_id: text("actionId"),
        time_seconds: text("timeSeconds"),
        tone,
        description: text("description"),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
