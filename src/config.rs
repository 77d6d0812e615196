//! Configuration management for pitchcast
//!
//! Non-secret settings live in ~/.config/pitchcast/config.json. The API key is
//! never written to disk: it comes from an explicit argument or RUNPOD_API_KEY.

use crate::commentary::models::DEFAULT_MODEL;
use crate::commentary::reconcile::ReconcilePolicy;
use crate::error::{CommentaryError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const API_KEY_ENV: &str = "RUNPOD_API_KEY";
pub const ENDPOINT_ENV: &str = "RUNPOD_ENDPOINT_URL";

/// Default round-trip budget for one completion call
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat-completions URL, e.g. https://api.runpod.ai/v2/<id>/openai/v1/chat/completions
    pub endpoint_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub reconcile: ReconcilePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            reconcile: ReconcilePolicy::default(),
        }
    }
}

/// Values given explicitly by the caller; they win over environment and file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub reconcile: Option<ReconcilePolicy>,
}

/// Validated settings a `CommentaryService` is built from.
#[derive(Clone)]
pub struct ServiceConfig {
    pub api_key: String,
    pub endpoint_url: Url,
    pub model: String,
    pub timeout: Duration,
    pub reconcile: ReconcilePolicy,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint_url", &self.endpoint_url.as_str())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("reconcile", &self.reconcile)
            .finish()
    }
}

impl ServiceConfig {
    /// Both values are required; an empty credential or a non-http(s) URL is
    /// rejected here, before any network activity.
    pub fn new(api_key: impl Into<String>, endpoint_url: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CommentaryError::Configuration(format!("{} is required", API_KEY_ENV)));
        }
        Ok(Self {
            api_key,
            endpoint_url: parse_endpoint(endpoint_url)?,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            reconcile: ReconcilePolicy::default(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reconcile(mut self, reconcile: ReconcilePolicy) -> Self {
        self.reconcile = reconcile;
        self
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CommentaryError::Configuration(format!("{} is required", ENDPOINT_ENV)));
    }
    let url = Url::parse(raw).map_err(|e| {
        CommentaryError::Configuration(format!("{} is not a valid URL ({}): {}", ENDPOINT_ENV, e, raw))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CommentaryError::Configuration(format!(
            "{} must use http or https, got {}",
            ENDPOINT_ENV, other
        ))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pitchcast"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from the default location, or return defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load config from `path`. A missing file yields defaults; a corrupt one
    /// is moved aside to `config.json.corrupt` and defaults are used.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                preserve_corrupt_config(path, &content);
                warn!(
                    path = %path.display(),
                    error = %err,
                    "config file was corrupted; a backup was saved and defaults were loaded"
                );
                Self::default()
            }
        }
    }

    /// Merge explicit overrides > process environment > this file.
    pub fn resolve(&self, overrides: Overrides) -> Result<ServiceConfig> {
        self.resolve_with(overrides, |name| std::env::var(name).ok())
    }

    pub(crate) fn resolve_with(
        &self,
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ServiceConfig> {
        let api_key = non_empty(overrides.api_key)
            .or_else(|| non_empty(env(API_KEY_ENV)))
            .ok_or_else(|| CommentaryError::Configuration(format!("{} is required", API_KEY_ENV)))?;
        let endpoint = non_empty(overrides.endpoint_url)
            .or_else(|| non_empty(env(ENDPOINT_ENV)))
            .or_else(|| non_empty(self.endpoint_url.clone()))
            .ok_or_else(|| CommentaryError::Configuration(format!("{} is required", ENDPOINT_ENV)))?;

        let model = non_empty(overrides.model).unwrap_or_else(|| self.model.clone());
        let timeout_secs = overrides.timeout_secs.unwrap_or(self.timeout_secs).max(1);

        Ok(ServiceConfig::new(api_key, &endpoint)?
            .with_model(model)
            .with_timeout(Duration::from_secs(timeout_secs))
            .with_reconcile(overrides.reconcile.unwrap_or(self.reconcile)))
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}
