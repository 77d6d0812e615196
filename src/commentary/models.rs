use crate::error::CommentaryError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Default model served by the completion endpoint
pub const DEFAULT_MODEL: &str = "skt/a.x-4.0-light";

/// Output ceiling, kept under the model's 8192-token context
pub const MAX_TOKENS: u32 = 4096;
pub const TEMPERATURE: f32 = 0.7;
pub const TOP_P: f32 = 0.9;

/// Match metadata. Free-form JSON object; fields are read through alias tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchContext(Map<String, Value>);

impl MatchContext {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// One on-field action. Keys may be camelCase or snake_case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionEvent(Map<String, Value>);

impl ActionEvent {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Commentary persona
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum CommentaryStyle {
    /// Broadcast caster: fast tempo, emotional
    Caster,
    /// Tactical analyst: calm, positional detail
    Analyst,
    /// Casual friend: informal, easy words
    Friend,
}

impl CommentaryStyle {
    pub const ALL: [CommentaryStyle; 3] = [
        CommentaryStyle::Caster,
        CommentaryStyle::Analyst,
        CommentaryStyle::Friend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommentaryStyle::Caster => "CASTER",
            CommentaryStyle::Analyst => "ANALYST",
            CommentaryStyle::Friend => "FRIEND",
        }
    }
}

impl fmt::Display for CommentaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentaryStyle {
    type Err = CommentaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        CommentaryStyle::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CommentaryError::InvalidStyle(s.to_string()))
    }
}

impl TryFrom<String> for CommentaryStyle {
    type Error = CommentaryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Emotional tag attached to a commentary line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tone {
    #[default]
    Default,
    Excited,
    Angry,
    Sad,
    Calm,
    Question,
    Emphasis,
}

impl Tone {
    const ALL: [Tone; 7] = [
        Tone::Default,
        Tone::Excited,
        Tone::Angry,
        Tone::Sad,
        Tone::Calm,
        Tone::Question,
        Tone::Emphasis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Default => "DEFAULT",
            Tone::Excited => "EXCITED",
            Tone::Angry => "ANGRY",
            Tone::Sad => "SAD",
            Tone::Calm => "CALM",
            Tone::Question => "QUESTION",
            Tone::Emphasis => "EMPHASIS",
        }
    }

    /// Lenient parse used on model output; anything unknown maps to `None`.
    pub fn parse_lenient(raw: &str) -> Option<Tone> {
        let trimmed = raw.trim();
        Tone::ALL
            .into_iter()
            .find(|tone| tone.as_str().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated sentence tied to one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentaryLine {
    pub action_id: String,
    pub time_seconds: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub description: String,
}

/// System + user text sent to the model for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}
