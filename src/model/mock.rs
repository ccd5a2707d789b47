//! Scripted model backend for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ModelError;

use super::{ChatMessage, TextGenerator, TextStream};

/// A model that replays scripted answers in order.
///
/// Records every incoming message list so tests can assert on call counts
/// and prompt contents. When the script runs dry it echoes the last user
/// message, which keeps the REPL usable with `SHEETWISE_BACKEND=mock`.
pub struct MockModel {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockModel {
    pub fn scripted(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A mock with no script; every answer echoes the last message.
    pub fn echo() -> Self {
        Self::scripted(Vec::new())
    }

    /// Number of times `generate` was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Messages from the nth call.
    pub fn call(&self, n: usize) -> Vec<ChatMessage> {
        self.calls.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl TextGenerator for MockModel {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<TextStream, ModelError> {
        self.calls.lock().unwrap().push(messages.to_vec());

        let answer = self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            messages
                .last()
                .map(|m| format!("(echo) {}", m.content))
                .unwrap_or_default()
        });

        // Deliver in two fragments so callers exercise accumulation.
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            let mid = answer.len() / 2;
            let mid = (0..=mid).rev().find(|i| answer.is_char_boundary(*i)).unwrap_or(0);
            let (a, b) = answer.split_at(mid);
            if !a.is_empty() {
                let _ = tx.send(a.to_string()).await;
            }
            if !b.is_empty() {
                let _ = tx.send(b.to_string()).await;
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::collect;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let model = MockModel::scripted(vec!["first".into(), "second".into()]);

        let mut s = model.generate(&[ChatMessage::user("a")]).await.unwrap();
        assert_eq!(collect(&mut s).await, "first");

        let mut s = model.generate(&[ChatMessage::user("b")]).await.unwrap();
        assert_eq!(collect(&mut s).await, "second");

        assert_eq!(model.call_count(), 2);
        assert_eq!(model.call(1)[0].content, "b");
    }

    #[tokio::test]
    async fn test_echo_when_script_empty() {
        let model = MockModel::echo();
        let mut s = model.generate(&[ChatMessage::user("hello")]).await.unwrap();
        assert_eq!(collect(&mut s).await, "(echo) hello");
    }
}
