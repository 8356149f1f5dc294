use async_trait::async_trait;
use recipe_flow::{Context, NextAction, Result, Task, TaskResult};
use serde_json::Value;
use tracing::{debug, warn};

use super::session_keys;
use crate::error::GenerationError;

/// Pulls the JSON object out of the model's free-form reply.
pub struct ParseResponseTask;

#[async_trait]
impl Task for ParseResponseTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let output: String = context.require(session_keys::MODEL_OUTPUT).await?;

        let parsed = extract_json_object(&output).inspect_err(|e| {
            warn!(
                error = %e,
                output_chars = output.chars().count(),
                "Model output could not be parsed"
            );
        })?;

        debug!("Model output parsed");
        context.set(session_keys::PARSED_RESPONSE, &parsed).await?;

        Ok(TaskResult::new(None, NextAction::Continue))
    }
}

/// Parse the span from the first `{` to the last `}`.
///
/// Prose and markdown fences around the object are ignored. Text holding more
/// than one object yields a span that is not valid JSON and fails.
pub fn extract_json_object(text: &str) -> std::result::Result<Value, GenerationError> {
    let start = text.find('{');
    let end = text.rfind('}');

    let span = match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(GenerationError::ParseFailed(
                "no JSON object found in model output".to_string(),
            ));
        }
    };

    serde_json::from_str(span).map_err(|e| GenerationError::ParseFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_extracts_object_from_prose() {
        let text = "Sure! Here you go:\n```json\n{\"title\": \"Soup\", \"servings\": 2}\n```\nEnjoy.";
        assert_eq!(
            extract_json_object(text).unwrap(),
            json!({"title": "Soup", "servings": 2})
        );
    }

    #[test]
    fn test_nested_braces_are_kept() {
        let text = r#"{"title": "A {curly} name", "meta": {"a": 1}}"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["title"], "A {curly} name");
        assert_eq!(value["meta"]["a"], 1);
    }

    #[test]
    fn test_missing_object_is_a_parse_failure() {
        for text in ["no json here", "} backwards {", ""] {
            let err = extract_json_object(text).unwrap_err();
            assert_eq!(err.code(), ErrorCode::AiResponseError);
            assert!(matches!(err, GenerationError::ParseFailed(_)));
        }
    }

    #[test]
    fn test_malformed_json_is_a_parse_failure() {
        let err = extract_json_object("{\"title\": \"Soup\",}").unwrap_err();
        assert!(matches!(err, GenerationError::ParseFailed(_)));
    }

    #[test]
    fn test_two_objects_fail() {
        assert!(extract_json_object("{\"a\": 1} and {\"b\": 2}").is_err());
    }

    #[tokio::test]
    async fn test_task_stores_parsed_value() {
        let context = Context::new();
        context
            .set(session_keys::MODEL_OUTPUT, "result: {\"title\": \"Rice\"}")
            .await
            .unwrap();

        ParseResponseTask.run(context.clone()).await.unwrap();

        let parsed: Value = context.get(session_keys::PARSED_RESPONSE).await.unwrap();
        assert_eq!(parsed, json!({"title": "Rice"}));
    }

    #[tokio::test]
    async fn test_task_error_downcasts_to_parse_failure() {
        let context = Context::new();
        context
            .set(session_keys::MODEL_OUTPUT, "I cannot help with that.")
            .await
            .unwrap();

        let err = ParseResponseTask.run(context).await.unwrap_err();
        let err = GenerationError::from_graph_error(err);
        assert!(matches!(err, GenerationError::ParseFailed(_)));
    }
}
