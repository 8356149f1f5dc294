use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use crate::config::{CorsOrigins, ProviderKind};
use crate::service::AppState;

pub const SERVICE_NAME: &str = "recipe-service";

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": state.started_at.elapsed().as_secs()
    }))
}

pub async fn detailed_health_check(State(state): State<AppState>) -> Json<Value> {
    let llm = &state.config.llm;
    let configured = llm.provider == ProviderKind::Fake || !llm.api_key.trim().is_empty();
    let cors_mode = match &state.config.cors_origins {
        CorsOrigins::Any => "any",
        CorsOrigins::List(_) => "allowlist",
    };
    let (status, provider_status) = if configured {
        ("healthy", "up")
    } else {
        ("degraded", "not_configured")
    };

    Json(json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": state.started_at.elapsed().as_secs(),
        "checks": {
            "modelProvider": {
                "status": provider_status,
                "provider": state.provider_name,
                "model": state.model,
                "configured": configured
            }
        },
        "system": {
            "pid": std::process::id(),
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "residentPages": resident_pages().await
        },
        "environment": {
            "logFormat": state.config.log_format,
            "corsMode": cors_mode,
            "port": state.config.port
        }
    }))
}

/// Resident set size in pages from `/proc/self/statm`. `None` off Linux.
async fn resident_pages() -> Option<u64> {
    let statm = tokio::fs::read_to_string("/proc/self/statm").await.ok()?;
    parse_statm(&statm)
}

fn parse_statm(statm: &str) -> Option<u64> {
    statm.split_whitespace().nth(1)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::llm::{FakeProvider, RetryPolicy};
    use crate::service::build_router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        let config = ServiceConfig::from_lookup(|name| match name {
            "RECIPE_LLM_PROVIDER" => Some("fake".to_string()),
            "CORS_ORIGINS" => Some("https://cook.example".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::new(
            Arc::new(FakeProvider::with_sample_recipe()),
            RetryPolicy::default(),
            config,
        );
        build_router(state)
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_parse_statm() {
        assert_eq!(parse_statm("1000 250 100 10 0 200 0\n"), Some(250));
        assert_eq!(parse_statm(""), None);
        assert_eq!(parse_statm("12 abc"), None);
    }

    #[tokio::test]
    async fn test_basic_health() {
        let (status, body) = get_json("/api/recipes/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], SERVICE_NAME);
        assert!(body["uptime"].is_u64());
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_detailed_health() {
        let (status, body) = get_json("/api/recipes/health/detailed").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["modelProvider"]["provider"], "fake");
        assert_eq!(body["checks"]["modelProvider"]["model"], "fake-model");
        assert_eq!(body["checks"]["modelProvider"]["configured"], true);
        assert_eq!(body["environment"]["corsMode"], "allowlist");
        assert_eq!(body["environment"]["port"], 3000);
        assert!(body["system"]["pid"].is_u64());
        assert!(body["system"].get("residentMemoryBytes").is_none());
        #[cfg(target_os = "linux")]
        assert!(body["system"]["residentPages"].as_u64().unwrap() > 0);
    }
}
