//! Model capability interface.
//!
//! Every layer that talks to a language model goes through [`TextGenerator`]:
//! an ordered list of role/content messages in, a lazy sequence of text
//! fragments out. Streaming backends send many fragments, blocking backends
//! send one; callers accumulate the same way either way.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::ModelError;

pub mod mock;
pub mod openai;

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
}

/// A finite, non-restartable sequence of text fragments.
///
/// The sender side is dropped when the answer is complete; `recv()` returning
/// `None` is the terminator.
pub type TextStream = mpsc::Receiver<String>;

/// Accumulate a whole stream into one string.
pub async fn collect(stream: &mut TextStream) -> String {
    let mut out = String::new();
    while let Some(chunk) = stream.recv().await {
        out.push_str(&chunk);
    }
    out
}

/// The one capability a model backend exposes.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a response to the given messages as a fragment stream.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<TextStream, ModelError>;
}

/// Build a model backend by name.
pub fn factory(backend: &str, config: &Config) -> Result<Arc<dyn TextGenerator>, ModelError> {
    match backend {
        "openai" => Ok(Arc::new(openai::OpenAiClient::new(
            &config.api_base,
            &config.api_key,
            &config.model,
        ))),
        "mock" => Ok(Arc::new(mock::MockModel::echo())),
        other => Err(ModelError::UnknownBackend(other.to_string())),
    }
}
