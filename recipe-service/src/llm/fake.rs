//! Fake LLM provider for testing and offline development.
//!
//! Replies are scripted: queued results are handed out in order, after which the
//! default response (if any) is returned for every call.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{GenerationPrompt, LlmError, LlmProvider};

/// Sample answer used when the service runs with `RECIPE_LLM_PROVIDER=fake`.
pub const SAMPLE_RECIPE_RESPONSE: &str = r#"Here is a recipe that uses your ingredients:
{
  "title": "Garlic Chicken Stir-fry",
  "description": "A quick weeknight stir-fry with tender chicken and crisp vegetables",
  "ingredients": ["chicken thigh", "onion", "garlic", "soy sauce", "vegetable oil"],
  "instructions": [
    "1. Slice the chicken and onion into bite-sized pieces",
    "2. Heat the oil in a wok over high heat",
    "3. Stir-fry the chicken until browned, then add onion and garlic",
    "4. Season with soy sauce and serve hot"
  ],
  "cookingTime": 20,
  "servings": 2
}
Enjoy!"#;

#[derive(Debug, Default)]
pub struct FakeProvider {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    default_response: Option<String>,
    prompts: Mutex<Vec<GenerationPrompt>>,
}

impl FakeProvider {
    /// A provider with no replies; every call fails until something is queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that always returns `response`.
    pub fn with_response(response: &str) -> Self {
        Self::new().with_default_response(response)
    }

    pub fn with_sample_recipe() -> Self {
        Self::with_response(SAMPLE_RECIPE_RESPONSE)
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Queue a successful reply.
    pub fn push_response(&self, response: &str) -> &Self {
        self.lock_replies().push_back(Ok(response.to_string()));
        self
    }

    /// Queue a failure.
    pub fn push_error(&self, error: LlmError) -> &Self {
        self.lock_replies().push_back(Err(error));
        self
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.lock_prompts().len()
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<GenerationPrompt> {
        self.lock_prompts().clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_prompts(&self) -> std::sync::MutexGuard<'_, Vec<GenerationPrompt>> {
        self.prompts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, prompt: &GenerationPrompt) -> Result<String, LlmError> {
        self.lock_prompts().push(prompt.clone());

        if let Some(reply) = self.lock_replies().pop_front() {
            return reply;
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(LlmError::RequestFailed(format!(
                "FakeProvider: no response configured for prompt (first 100 chars): {}",
                prompt.text.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
