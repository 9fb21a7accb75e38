//! Flavor-text requests and their deterministic fallbacks.
//!
//! The core never talks to the text service. It hands out an
//! [`ExamineRequest`], and whoever runs the service reports back through
//! [`resolve`], which turns any failure into a fixed sentence.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Something to describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamineRequest {
    /// Object name, e.g. "Herb Patch".
    pub object: String,
    /// One short sentence of state, e.g. "Current stage: READY.".
    pub context: String,
}

impl ExamineRequest {
    /// Create a request.
    #[must_use]
    pub fn new(object: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            context: context.into(),
        }
    }

    /// Prompt sent to a text-generation model.
    #[must_use]
    pub fn prompt(&self) -> String {
        format!(
            "Write a witty, single-sentence \"Examine\" text for a {} in an Old School RuneScape style game.\n\
             Context: {}\n\
             Keep it under 15 words.\n\
             Do not include quotes.\n\
             Examples:\n\
             - \"It's a tree.\"\n\
             - \"A sturdy looking obstacle.\"\n\
             - \"I wonder what's growing in here?\"",
            self.object, self.context
        )
    }
}

/// Why the flavor-text service produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExamineError {
    /// No API key configured.
    #[error("no API key configured")]
    MissingCredentials,
    /// Request failed or timed out.
    #[error("examine request failed: {0}")]
    Transport(String),
    /// The service answered with no text.
    #[error("examine response was empty")]
    EmptyResponse,
}

/// Fixed text used when the service fails.
#[must_use]
pub fn fallback_text(object: &str, error: &ExamineError) -> String {
    match error {
        ExamineError::MissingCredentials => "The gods (API Key) are silent.".to_string(),
        ExamineError::Transport(_) => format!("It appears to be a {object}."),
        ExamineError::EmptyResponse => format!("It is a {object}."),
    }
}

/// Final text for a finished request. Never fails.
#[must_use]
pub fn resolve(object: &str, result: Result<String, ExamineError>) -> String {
    match result {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => fallback_text(object, &ExamineError::EmptyResponse),
        Err(error) => {
            if !matches!(error, ExamineError::MissingCredentials) {
                tracing::warn!(object, %error, "Falling back to default examine text");
            }
            fallback_text(object, &error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_text_passes_through() {
        let text = resolve("Herb Patch", Ok("  Weeds, as far as the eye can see. ".to_string()));
        assert_eq!(text, "Weeds, as far as the eye can see.");
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(
            resolve("Goblin", Err(ExamineError::MissingCredentials)),
            "The gods (API Key) are silent."
        );
        assert_eq!(
            resolve("Goblin", Err(ExamineError::Transport("timeout".into()))),
            "It appears to be a Goblin."
        );
        assert_eq!(resolve("Goblin", Err(ExamineError::EmptyResponse)), "It is a Goblin.");
        assert_eq!(resolve("Goblin", Ok("   ".into())), "It is a Goblin.");
    }

    #[test]
    fn test_prompt_mentions_object_and_context() {
        let request = ExamineRequest::new("Herb Patch", "Current stage: SEEDS.");
        let prompt = request.prompt();
        assert!(prompt.contains("for a Herb Patch"));
        assert!(prompt.contains("Context: Current stage: SEEDS."));
    }
}
