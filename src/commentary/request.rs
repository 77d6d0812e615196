use super::models::{ActionEvent, CommentaryStyle, MatchContext};
use crate::error::{CommentaryError, Result};
use serde::Deserialize;

/// A commentary request document: one match, one batch of actions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentaryRequest {
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default, alias = "match_info")]
    pub match_info: MatchContext,
    #[serde(default, alias = "raw_data")]
    pub raw_data: Vec<ActionEvent>,
}

impl CommentaryRequest {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CommentaryError::Request(e.to_string()))
    }

    /// An explicit style wins over the one in the document.
    pub fn style(&self, explicit: Option<CommentaryStyle>) -> Result<CommentaryStyle> {
        if let Some(style) = explicit {
            return Ok(style);
        }
        match self.style.as_deref() {
            Some(raw) => raw.parse(),
            None => Err(CommentaryError::Request("no style given".to_string())),
        }
    }
}
