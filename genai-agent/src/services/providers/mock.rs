//! Mock provider implementation for testing.

use super::{FinishReason, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::Mutex;

enum MockBehaviour {
    Reply(String),
    Truncated(String),
    Fail(String),
    Unconfigured,
}

/// Mock text provider for testing. Records every prompt it receives.
pub struct MockTextProvider {
    behaviour: MockBehaviour,
    prompts: Mutex<Vec<String>>,
}

impl MockTextProvider {
    /// Answer every prompt with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with(MockBehaviour::Reply(text.into()))
    }

    /// Answer with `text` but report that the output limit was hit.
    pub fn truncated(text: impl Into<String>) -> Self {
        Self::with(MockBehaviour::Truncated(text.into()))
    }

    /// Fail every prompt with an API error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with(MockBehaviour::Fail(message.into()))
    }

    /// Behave like a provider with no credential.
    pub fn unconfigured() -> Self {
        Self::with(MockBehaviour::Unconfigured)
    }

    fn with(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

fn reply(prompt: &str, text: &str, finish_reason: FinishReason) -> ProviderResponse {
    ProviderResponse {
        text: text.to_string(),
        input_tokens: prompt.len() as i32 / 4,
        output_tokens: text.len() as i32 / 4,
        finish_reason,
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(&self, prompt: &str) -> Result<ProviderResponse, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        match &self.behaviour {
            MockBehaviour::Reply(text) => Ok(reply(prompt, text, FinishReason::Complete)),
            MockBehaviour::Truncated(text) => Ok(reply(prompt, text, FinishReason::Length)),
            MockBehaviour::Fail(message) => Err(ProviderError::ApiError(message.clone())),
            MockBehaviour::Unconfigured => Err(ProviderError::NotConfigured(
                "Mock text provider has no API key".to_string(),
            )),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn is_configured(&self) -> bool {
        !matches!(self.behaviour, MockBehaviour::Unconfigured)
    }
}
