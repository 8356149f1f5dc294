//! OpenRouter provider (OpenAI-compatible chat completions).

use async_trait::async_trait;
use reqwest::StatusCode;
use rig::{client::CompletionClient, completion::Prompt, providers::openrouter};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{GenerationPrompt, LlmError, LlmProvider};

const SYSTEM_PREAMBLE: &str = "You are a professional chef and recipe writer. \
You always answer with a single JSON object and nothing else.";

const MAX_TOKENS: u32 = 2000;

pub struct OpenRouterProvider {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
    client: openrouter::Client,
}

impl OpenRouterProvider {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        let client = openrouter::Client::new(&api_key);
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            client,
        }
    }

    /// Text-only prompts go through a rig agent.
    async fn complete_text(&self, text: &str) -> Result<String, LlmError> {
        let agent = self.client.agent(&self.model).preamble(SYSTEM_PREAMBLE).build();

        agent
            .prompt(text)
            .await
            .map_err(|e| classify_agent_error(&e.to_string()))
    }

    /// Prompts with photos need multi-part user content, which is sent directly.
    async fn complete_with_images(&self, prompt: &GenerationPrompt) -> Result<String, LlmError> {
        let mut content = vec![json!({
            "type": "text",
            "text": prompt.text
        })];
        content.extend(prompt.images.iter().map(|image| {
            json!({
                "type": "image_url",
                "image_url": { "url": image.data_url() }
            })
        }));

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PREAMBLE },
                { "role": "user", "content": content }
            ],
            "max_tokens": MAX_TOKENS
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }

        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        extract_message_content(&body)
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn complete(&self, prompt: &GenerationPrompt) -> Result<String, LlmError> {
        debug!(
            model = %self.model,
            images = prompt.images.len(),
            prompt_chars = prompt.text.chars().count(),
            "Calling OpenRouter"
        );

        let text = if prompt.images.is_empty() {
            self.complete_text(&prompt.text).await?
        } else {
            self.complete_with_images(prompt).await?
        };

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        info!(response_chars = text.chars().count(), "OpenRouter responded");
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn map_transport_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout(error.to_string())
    } else {
        LlmError::RequestFailed(error.to_string())
    }
}

/// rig reports provider failures as text, so the status is recovered from the message.
fn classify_agent_error(message: &str) -> LlmError {
    let lower = message.to_lowercase();
    if is_rate_limit_message(&lower) {
        LlmError::RateLimited {
            retry_after_secs: None,
        }
    } else if lower.contains("timed out") || lower.contains("timeout") {
        LlmError::Timeout(message.to_string())
    } else {
        LlmError::RequestFailed(message.to_string())
    }
}

/// A standalone `429` token, or the usual rate-limit phrases. Counts like `4290` do not match.
fn is_rate_limit_message(lower: &str) -> bool {
    lower.contains("too many requests")
        || lower.contains("rate limit")
        || lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| token == "429")
}

/// Pull `choices[0].message.content` out of a chat-completions body.
fn extract_message_content(body: &str) -> Result<String, LlmError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| LlmError::RequestFailed(format!("Invalid response body from LLM: {e}")))?;

    value["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or(LlmError::EmptyResponse)
}
