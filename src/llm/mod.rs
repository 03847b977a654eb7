//! Chat-completion collaborator.
//!
//! Everything that talks to a model goes through [`ChatClient`], so batch code
//! can be driven by a scripted client in tests.

pub mod client;
pub mod prompts;

pub use client::{normalize_url, OpenAiChatClient};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Model reply text plus the full response body.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub raw: Value,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing API key for model '{0}' (set OPENAI_API_KEY or llm.api_key)")]
    MissingApiKey(String),

    #[error("LLM request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid LLM response: {0}")]
    Decode(String),
}

pub trait ChatClient: Send + Sync {
    /// Name of the model this client talks to.
    fn model(&self) -> &str;

    fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError>;
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    /// Replies with a fixed prefix plus the last user message; records every call.
    pub struct EchoClient {
        pub model: String,
        pub prefix: String,
        pub calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl EchoClient {
        pub fn new(model: &str, prefix: &str) -> Self {
            Self { model: model.into(), prefix: prefix.into(), calls: Mutex::new(Vec::new()) }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl ChatClient for EchoClient {
        fn model(&self) -> &str {
            &self.model
        }

        fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
            let text = format!("{}{}", self.prefix, last);
            let raw = serde_json::json!({ "choices": [{ "message": { "content": text } }] });
            Ok(Completion { text, raw })
        }
    }
}
