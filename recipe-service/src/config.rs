//! Service configuration from environment variables.

use std::env;
use thiserror::Error;

/// Default OpenRouter base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model. Must accept image input.
pub const DEFAULT_MODEL: &str = "openai/gpt-4.1-mini";

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Which model backend answers generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenRouter,
    /// Canned responses, for local development without an API key.
    Fake,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    /// Empty for the fake provider.
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// How cross-origin requests are handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub cors_origins: CorsOrigins,
    pub log_format: String,
    pub llm: LlmConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// - `PORT`: listening port (default 3000)
    /// - `CORS_ORIGINS`: comma separated allowlist, unset or `*` allows any origin
    /// - `LOG_FORMAT`: `pretty` or `json` (default)
    /// - `RECIPE_LLM_PROVIDER`: `openrouter` (default) or `fake`
    /// - `OPENROUTER_API_KEY`: required for `openrouter`
    /// - `RECIPE_LLM_MODEL`: model name (default "openai/gpt-4.1-mini")
    /// - `OPENROUTER_BASE_URL`: API base URL
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`ServiceConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "PORT".to_string(),
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let cors_origins = parse_cors_origins(lookup("CORS_ORIGINS").as_deref());

        let log_format = lookup("LOG_FORMAT").unwrap_or_else(|| "json".to_string());

        let provider = match lookup("RECIPE_LLM_PROVIDER").as_deref().map(str::trim) {
            None | Some("") | Some("openrouter") => ProviderKind::OpenRouter,
            Some("fake") => ProviderKind::Fake,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "RECIPE_LLM_PROVIDER".to_string(),
                    value: other.to_string(),
                });
            }
        };

        let api_key = match provider {
            ProviderKind::OpenRouter => lookup("OPENROUTER_API_KEY")
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?,
            ProviderKind::Fake => String::new(),
        };

        let model = lookup("RECIPE_LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = lookup("OPENROUTER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            port,
            cors_origins,
            log_format,
            llm: LlmConfig {
                provider,
                api_key,
                model,
                base_url,
            },
        })
    }
}

fn parse_cors_origins(raw: Option<&str>) -> CorsOrigins {
    let Some(raw) = raw else {
        return CorsOrigins::Any;
    };

    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        CorsOrigins::Any
    } else {
        CorsOrigins::List(origins)
    }
}
