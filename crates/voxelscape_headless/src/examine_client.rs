//! Flavor-text collaborator backed by the Gemini `generateContent` API.
//!
//! Requests run on spawned tasks and report back through a channel, so a
//! slow or failing service never holds up the clock. Every failure maps to
//! an [`ExamineError`], which the core turns into fixed text.

use std::time::Duration;

use voxelscape_core::examine::{ExamineError, ExamineRequest};

/// Default API root.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Environment variables searched for an API key, in order.
const KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// HTTP client for examine text.
#[derive(Debug, Clone)]
pub struct ExamineClient {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

impl ExamineClient {
    /// Client with an explicit key (`None` answers every request with
    /// [`ExamineError::MissingCredentials`]).
    pub fn new(api_key: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            http,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Client keyed from `GEMINI_API_KEY` or `API_KEY`.
    pub fn from_env() -> Self {
        let key = KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty());
        if key.is_none() {
            tracing::info!("No examine API key set; examine text will use fallbacks");
        }
        Self::new(key)
    }

    /// Point the client at a different API root.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Use a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Whether a key is configured.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Ask the model for one line of examine text.
    pub async fn describe(&self, request: &ExamineRequest) -> Result<String, ExamineError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(ExamineError::MissingCredentials);
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": request.prompt() }] }],
            "generationConfig": { "thinkingConfig": { "thinkingBudget": 0 } },
        });

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExamineError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExamineError::Transport(format!("http={}", status.as_u16())));
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ExamineError::Transport(e.to_string()))?;
        extract_text(&value).ok_or(ExamineError::EmptyResponse)
    }
}

/// Pull the first candidate's text out of a `generateContent` response.
pub fn extract_text(value: &serde_json::Value) -> Option<String> {
    let parts = value
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text")?.as_str())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
