use axum::{
    Extension, Router,
    extract::{
        DefaultBodyLimit, Multipart, Request, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderValue, Method, StatusCode},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use recipe_flow::Graph;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::{CorsOrigins, ServiceConfig},
    error::GenerationError,
    health::{detailed_health_check, health_check},
    llm::{LlmError, LlmProvider, RetryPolicy, create_provider},
    models::{
        GenerateErrorResponse, GenerateSuccessResponse, ImageUpload, RecipeRequest, ResponseMeta,
    },
    tasks::normalize_input::{MAX_IMAGE_BYTES, MAX_IMAGES},
    workflow::{build_recipe_workflow, generate_recipe},
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Room for the maximum number of full-size images plus the text fields.
const MAX_BODY_BYTES: usize = MAX_IMAGES * MAX_IMAGE_BYTES + 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<Graph>,
    pub provider_name: &'static str,
    pub model: String,
    pub config: Arc<ServiceConfig>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy, config: ServiceConfig) -> Self {
        let provider_name = provider.provider_name();
        let model = provider.model_name().to_string();
        let graph = Arc::new(build_recipe_workflow(provider, retry));

        Self {
            graph,
            provider_name,
            model,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

/// Per-request id, set by [`request_id_middleware`].
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub fn create_app(config: ServiceConfig) -> Result<Router, LlmError> {
    let provider = create_provider(&config.llm)?;
    info!(
        provider = provider.provider_name(),
        model = provider.model_name(),
        "Model provider ready"
    );

    let state = AppState::new(provider, RetryPolicy::default(), config);
    Ok(build_router(state))
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(root))
        .route("/api/recipes/generate", post(generate))
        .route("/api/recipes/health", get(health_check))
        .route("/api/recipes/health/detailed", get(detailed_health_check))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    match origins {
        CorsOrigins::Any => CorsLayer::permissive(),
        CorsOrigins::List(list) => {
            let origins: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any)
        }
    }
}

/// Tag every request with a fresh id: request extension, tracing span and response header.
async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path()
    );

    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Recipe Generation Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Generates recipes from ingredient lists and photos with an LLM",
        "endpoints": {
            "POST /api/recipes/generate": "Generate a recipe (multipart: ingredients, preferences, images)",
            "GET /api/recipes/health": "Health check",
            "GET /api/recipes/health/detailed": "Health check with provider and process details"
        }
    }))
}

async fn generate(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let started = Instant::now();

    let outcome = async {
        let multipart =
            multipart.map_err(|rejection| GenerationError::invalid(rejection.body_text()))?;
        let request = read_recipe_request(multipart).await?;

        info!(
            images = request.images.len(),
            has_preferences = request.preferences.is_some(),
            "Generating recipe"
        );

        generate_recipe(&state.graph, request).await
    }
    .await;

    let meta = ResponseMeta {
        request_id,
        processing_time: started.elapsed().as_millis() as u64,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    match outcome {
        Ok(generated) => {
            info!(
                title = %generated.recipe.title,
                score = generated.quality.score,
                processing_ms = meta.processing_time,
                "Recipe generated"
            );

            Json(GenerateSuccessResponse {
                success: true,
                data: generated.recipe,
                meta,
                quality_info: generated.quality,
            })
            .into_response()
        }
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                error!(code = ?err.code(), error = %err, "Recipe generation failed");
            } else {
                warn!(code = ?err.code(), error = %err, "Recipe request rejected");
            }

            (status, Json(GenerateErrorResponse::new(&err, meta))).into_response()
        }
    }
}

/// Collect the form fields. Unknown fields are skipped.
async fn read_recipe_request(mut multipart: Multipart) -> Result<RecipeRequest, GenerationError> {
    let mut ingredients = None;
    let mut preferences = None;
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "ingredients" => ingredients = Some(field.text().await.map_err(multipart_error)?),
            "preferences" => preferences = Some(field.text().await.map_err(multipart_error)?),
            "images" | "images[]" => {
                let file_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;

                // Browsers send an empty, unnamed part for an untouched file input.
                if data.is_empty() && file_name.is_none() {
                    continue;
                }

                images.push(ImageUpload {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let ingredients =
        ingredients.ok_or_else(|| GenerationError::invalid("ingredients is required"))?;

    Ok(RecipeRequest {
        ingredients: Value::String(ingredients),
        preferences,
        images,
    })
}

fn multipart_error(error: MultipartError) -> GenerationError {
    GenerationError::invalid(format!("Invalid multipart body: {}", error.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeProvider;
    use axum::body::{Body, to_bytes};
    use axum::http::{self, header::CONTENT_TYPE};
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "recipe-test-boundary";
    const STIR_FRY: &str = r#"Here is your recipe: {"title":"Stir-fry","description":"Tasty","ingredients":["onion","onion","chicken thigh"],"instructions":["1. cut","ok"],"cookingTime":20,"servings":2} Enjoy!"#;

    fn test_config() -> ServiceConfig {
        ServiceConfig::from_lookup(|name| match name {
            "RECIPE_LLM_PROVIDER" => Some("fake".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn app_with(provider: FakeProvider) -> Router {
        let retry = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        };
        build_router(AppState::new(Arc::new(provider), retry, test_config()))
    }

    #[derive(Default)]
    struct FormBody(Vec<u8>);

    impl FormBody {
        fn text(mut self, name: &str, value: &str) -> Self {
            self.0.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
            self
        }

        fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
            self.0.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            self.0.extend_from_slice(data);
            self.0.extend_from_slice(b"\r\n");
            self
        }

        fn into_request(mut self) -> Request<Body> {
            self.0
                .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
            http::Request::builder()
                .method("POST")
                .uri("/api/recipes/generate")
                .header(
                    CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(self.0))
                .unwrap()
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_enhanced_recipe() {
        let app = app_with(FakeProvider::with_response(STIR_FRY));
        let request = FormBody::default()
            .text("ingredients", r#"["onion","chicken thigh"]"#)
            .text("preferences", "quick")
            .text("unrelated", "ignored")
            .into_request();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let header_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["title"], "Stir-fry");
        assert_eq!(body["data"]["ingredients"], json!(["chicken thigh", "onion"]));
        assert_eq!(body["data"]["instructions"], json!(["1. cut."]));
        assert_eq!(body["data"]["cookingTime"], 20);
        assert_eq!(body["meta"]["requestId"], header_id.as_str());
        assert!(body["meta"]["processingTime"].is_u64());
        assert!(body["qualityInfo"]["score"].is_u64());
    }

    #[tokio::test]
    async fn test_images_are_forwarded() {
        let provider = Arc::new(FakeProvider::with_response(STIR_FRY));
        let retry = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(1),
        };
        let app = build_router(AppState::new(provider.clone(), retry, test_config()));

        let request = FormBody::default()
            .text("ingredients", r#"["egg"]"#)
            .file("images", "egg.png", "image/png", b"\x89PNG\r\n\x1a\n0000")
            .into_request();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let prompt = &provider.prompts()[0];
        assert_eq!(prompt.images.len(), 1);
        assert_eq!(prompt.images[0].mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_missing_ingredients_is_rejected() {
        let app = app_with(FakeProvider::with_response(STIR_FRY));
        let request = FormBody::default().text("preferences", "spicy").into_request();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
        assert!(body["meta"]["requestId"].is_string());
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_rejected() {
        let app = app_with(FakeProvider::with_response(STIR_FRY));
        let request = http::Request::builder()
            .method("POST")
            .uri("/api/recipes/generate")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"ingredients":["egg"]}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_unsupported_image_type_is_rejected() {
        let app = app_with(FakeProvider::with_response(STIR_FRY));
        let request = FormBody::default()
            .text("ingredients", r#"["egg"]"#)
            .file("images", "notes.txt", "text/plain", b"hello")
            .into_request();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("unsupported type")
        );
    }

    #[tokio::test]
    async fn test_provider_outage_maps_to_bad_gateway() {
        let app = app_with(FakeProvider::new());
        let request = FormBody::default()
            .text("ingredients", r#"["egg"]"#)
            .into_request();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "AI_SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_429() {
        let provider = FakeProvider::new();
        for _ in 0..3 {
            provider.push_error(LlmError::RateLimited {
                retry_after_secs: Some(1),
            });
        }
        let app = app_with(provider);
        let request = FormBody::default()
            .text("ingredients", r#"["egg"]"#)
            .into_request();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn test_unparseable_model_output_is_ai_response_error() {
        let app = app_with(FakeProvider::with_response("no recipe, sorry"));
        let request = FormBody::default()
            .text("ingredients", r#"["egg"]"#)
            .into_request();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "AI_RESPONSE_ERROR");
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let app = app_with(FakeProvider::new());
        let request = http::Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        let body = json_body(response).await;
        assert!(body["endpoints"]["POST /api/recipes/generate"].is_string());
    }
}
