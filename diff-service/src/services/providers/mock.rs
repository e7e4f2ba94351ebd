//! Scripted provider for tests and offline local runs.

use super::{FinishReason, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum MockBehavior {
    Respond(String),
    Reply(fn(&str) -> String),
    Fail(String),
    Empty,
}

/// Mock text provider that records every prompt it receives.
pub struct MockTextProvider {
    behavior: MockBehavior,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockTextProvider {
    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text`.
    pub fn responding(text: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Respond(text.into()))
    }

    /// Answers with `reply(prompt)`.
    pub fn replying_with(reply: fn(&str) -> String) -> Self {
        Self::with_behavior(MockBehavior::Reply(reply))
    }

    /// Always fails with an API error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Fail(message.into()))
    }

    /// Answers without any text.
    pub fn empty() -> Self {
        Self::with_behavior(MockBehavior::Empty)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(&self, prompt: &str) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let text = match &self.behavior {
            MockBehavior::Respond(text) => Some(text.clone()),
            MockBehavior::Reply(reply) => Some(reply(prompt)),
            MockBehavior::Fail(message) => return Err(ProviderError::ApiError(message.clone())),
            MockBehavior::Empty => None,
        };

        Ok(ProviderResponse {
            output_tokens: text.as_ref().map(|t| t.len() as i32 / 4).unwrap_or(0),
            text,
            input_tokens: prompt.len() as i32 / 4,
            finish_reason: FinishReason::Complete,
        })
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
