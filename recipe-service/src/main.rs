use anyhow::Context as _;
use recipe_service::{ServiceConfig, create_app};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured JSON tracing, or pretty output when `LOG_FORMAT=pretty`
fn init_tracing(log_format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "recipe_service=debug,recipe_flow=debug,tower_http=debug".into()
    });

    match log_format {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("invalid configuration")?;
    init_tracing(&config.log_format);

    let port = config.port;
    let app = create_app(config).context("failed to create model provider")?;

    let listener = TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    let addr = listener.local_addr()?;

    info!("Recipe service starting on {}", addr);
    info!("Generate endpoint: POST http://{}/api/recipes/generate", addr);
    info!("Health check endpoint: http://{}/api/recipes/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
