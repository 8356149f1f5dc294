use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorCode, GenerationError};

/// A generated recipe as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooking_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
}

/// One uploaded photo, as read from the multipart body.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A generation request before normalization.
#[derive(Debug, Clone, Default)]
pub struct RecipeRequest {
    /// A JSON array, a JSON-encoded array string, or a comma separated string.
    pub ingredients: Value,
    pub preferences: Option<String>,
    pub images: Vec<ImageUpload>,
}

/// Advisory warnings about a generated recipe. Never blocks a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: u8,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub request_id: String,
    /// Milliseconds spent handling the request.
    pub processing_time: u64,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSuccessResponse {
    pub success: bool,
    pub data: Recipe,
    pub meta: ResponseMeta,
    pub quality_info: QualityReport,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

impl GenerateErrorResponse {
    pub fn new(error: &GenerationError, meta: ResponseMeta) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: error.code(),
                message: error.to_string(),
            },
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recipe_uses_camel_case_and_skips_missing_numbers() {
        let recipe = Recipe {
            title: "Stir-fry".into(),
            description: "Tasty.".into(),
            ingredients: vec!["onion".into()],
            instructions: vec!["1. Cut.".into()],
            cooking_time: Some(15),
            servings: None,
        };

        let value = serde_json::to_value(&recipe).unwrap();
        assert_eq!(value["cookingTime"], json!(15));
        assert!(value.get("servings").is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let meta = ResponseMeta {
            request_id: "req-1".into(),
            processing_time: 12,
            timestamp: "2024-01-01T00:00:00Z".into(),
        };
        let body = GenerateErrorResponse::new(&GenerationError::invalid("bad input"), meta);
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(
            value,
            json!({
                "success": false,
                "error": { "code": "INVALID_REQUEST", "message": "bad input" },
                "meta": {
                    "requestId": "req-1",
                    "processingTime": 12,
                    "timestamp": "2024-01-01T00:00:00Z"
                }
            })
        );
    }
}
