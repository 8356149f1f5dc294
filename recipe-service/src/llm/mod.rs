//! Model provider abstraction for recipe generation.
//!
//! The pipeline only sees [`LlmProvider`]; the concrete provider is picked from
//! configuration at startup and handed to the workflow, so tests can swap in
//! [`FakeProvider`].

mod fake;
mod openrouter;
mod retry;

pub use fake::FakeProvider;
pub use openrouter::OpenRouterProvider;
pub use retry::{RetryPolicy, retry_with_backoff};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{LlmConfig, ProviderKind};

/// Error type for LLM operations.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API request timed out: {0}")]
    Timeout(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// An image forwarded to the model, already base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub data: String,
}

impl ImageAttachment {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Everything sent to the model for one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPrompt {
    pub text: String,
    #[serde(default)]
    pub images: Vec<ImageAttachment>,
}

impl GenerationPrompt {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
        }
    }
}

/// Trait for LLM providers.
///
/// Implementations make a single call and return the model's raw text. Retrying is
/// the caller's job.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, prompt: &GenerationPrompt) -> Result<String, LlmError>;

    /// Provider name (e.g. "openrouter", "fake").
    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}

/// Build the provider selected by configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.provider {
        ProviderKind::OpenRouter => {
            if config.api_key.trim().is_empty() {
                return Err(LlmError::NotConfigured(
                    "OPENROUTER_API_KEY not set".to_string(),
                ));
            }
            Ok(Arc::new(OpenRouterProvider::new(
                config.api_key.clone(),
                config.model.clone(),
                config.base_url.clone(),
            )))
        }
        ProviderKind::Fake => Ok(Arc::new(FakeProvider::with_sample_recipe())),
    }
}
