mod analyses;
mod app;
mod config;
mod gemini;
mod images;
mod pages;
mod state;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let default_filter = if config.debug {
        "nutriscan=debug,axum=info,tower_http=debug"
    } else {
        "nutriscan=info,axum=info,tower_http=info"
    };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    if config.uses_dev_session_secret() {
        tracing::warn!("SESSION_SECRET not set; using the development fallback");
    }

    let (host, port) = (config.host.clone(), config.port);
    let app_state = AppState::init(config).await?;

    let app = app::build_app(app_state.clone());
    let served = app::serve(app, &host, port).await;

    app_state.close().await;
    tracing::info!("shut down");
    served
}
