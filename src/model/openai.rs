//! OpenAI-compatible chat backend with SSE streaming.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::error::ModelError;

use super::{ChatMessage, TextGenerator, TextStream};

/// Client for any `/chat/completions` endpoint that speaks the OpenAI
/// streaming protocol (OpenAI, Azure OpenAI, local gateways).
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<TextStream, ModelError> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.7,
            "stream": true,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{}: {}", status, detail)));
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut pending = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        log::warn!("Model stream interrupted: {}", e);
                        break;
                    }
                };
                pending.push_str(&String::from_utf8_lossy(&chunk));

                // SSE events are newline-delimited `data: {...}` lines;
                // anything after the last newline may be a partial event.
                while let Some(nl) = pending.find('\n') {
                    let line = pending[..nl].trim().to_string();
                    pending.drain(..=nl);
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        return;
                    }
                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(parsed) => {
                            let delta = parsed
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|c| c.delta.content);
                            if let Some(text) = delta {
                                if tx.send(text).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) => log::warn!("Skipping unparseable stream event: {}", e),
                    }
                }
            }
        });

        Ok(rx)
    }
}
