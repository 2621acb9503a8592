use std::sync::Arc;

use anyhow::Context;
use taleseed::config::{load_dotenv, mask_api_key};
use taleseed::{AppConfig, AppState, GeminiClient, StoryService, router};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = load_dotenv();

    let config = AppConfig::from_env().context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    fmt().with_env_filter(filter).init();

    match dotenv {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "loaded .env"),
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "failed to load .env, using process environment"),
    }

    let settings = Arc::new(config.generation.clone());
    tracing::info!(
        model = %settings.model,
        temperature = settings.temperature,
        max_output_tokens = settings.max_output_tokens,
        api_key = %mask_api_key(&settings.api_key),
        log_level = %config.log_level,
        "configuration loaded"
    );

    let generator = Arc::new(GeminiClient::new(&settings).context("failed to build model client")?);
    let state = AppState {
        story: StoryService::new(generator, settings),
    };

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr()))?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;

    tracing::info!("shutting down");
    Ok(())
}
