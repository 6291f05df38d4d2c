use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leaderboard_service::config::Config;
use leaderboard_service::handlers::{self, LeaderboardHandlerState, StaticAssets};
use leaderboard_service::services::{build_store, LeaderboardService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Starting leaderboard-service v{}", env!("CARGO_PKG_VERSION"));

    // Backend is chosen once and shared by every worker
    let service = Arc::new(LeaderboardService::new(build_store(&config)));
    tracing::info!("Leaderboard backend: {}", service.backend());

    let handler_state = web::Data::new(LeaderboardHandlerState { service });
    let assets = web::Data::new(StaticAssets::new(config.static_root.clone()));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        "Serving {} on http://localhost:{}",
        config.static_root.display(),
        config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(handler_state.clone())
            .app_data(assets.clone())
            .wrap(middleware::Logger::default())
            .configure(handlers::configure_routes)
    })
    .bind(&addr)
    .with_context(|| format!("Failed to bind {}", addr))?
    .run()
    .await
    .context("HTTP server error")
}
