use std::sync::Arc;

use async_trait::async_trait;
use recipe_flow::{Context, NextAction, Result, Task, TaskResult};
use tracing::{debug, info};

use super::session_keys;
use crate::error::GenerationError;
use crate::llm::{GenerationPrompt, LlmProvider, RetryPolicy, retry_with_backoff};

/// Calls the model provider, retrying failed calls with exponential backoff.
pub struct InvokeModelTask {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
}

impl InvokeModelTask {
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }
}

#[async_trait]
impl Task for InvokeModelTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let prompt: GenerationPrompt = context.require(session_keys::PROMPT).await?;

        info!(
            provider = self.provider.provider_name(),
            model = self.provider.model_name(),
            max_attempts = self.retry.max_attempts,
            "Invoking model"
        );

        let provider = &self.provider;
        let prompt = &prompt;
        let output = retry_with_backoff(&self.retry, move |attempt| {
            debug!(attempt, "Model attempt");
            provider.complete(prompt)
        })
        .await
        .map_err(GenerationError::from)?;

        context.set(session_keys::MODEL_OUTPUT, &output).await?;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::Continue,
            Some(format!("Model returned {} characters", output.chars().count())),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::llm::{FakeProvider, LlmError};
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    async fn context_with_prompt() -> Context {
        let context = Context::new();
        context
            .set(session_keys::PROMPT, GenerationPrompt::text_only("make dinner"))
            .await
            .unwrap();
        context
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let provider = Arc::new(FakeProvider::with_response("{\"title\":\"ok\"}"));
        provider
            .push_error(LlmError::RequestFailed("boom".into()))
            .push_error(LlmError::ApiError {
                status: 503,
                message: "unavailable".into(),
            });

        let context = context_with_prompt().await;
        InvokeModelTask::new(provider.clone(), fast_retry())
            .run(context.clone())
            .await
            .unwrap();

        assert_eq!(provider.calls(), 3);
        let output: String = context.get(session_keys::MODEL_OUTPUT).await.unwrap();
        assert_eq!(output, "{\"title\":\"ok\"}");
    }

    #[tokio::test]
    async fn test_surfaces_last_error_after_three_attempts() {
        let provider = Arc::new(FakeProvider::new());
        provider
            .push_error(LlmError::RequestFailed("first".into()))
            .push_error(LlmError::RequestFailed("second".into()))
            .push_error(LlmError::RateLimited {
                retry_after_secs: None,
            })
            .push_response("never reached");

        let context = context_with_prompt().await;
        let err = InvokeModelTask::new(provider.clone(), fast_retry())
            .run(context.clone())
            .await
            .unwrap_err();

        assert_eq!(provider.calls(), 3);
        let err = GenerationError::from_graph_error(err);
        assert_eq!(err.code(), ErrorCode::RateLimitExceeded);
        assert!(!context.contains(session_keys::MODEL_OUTPUT));
    }
}
