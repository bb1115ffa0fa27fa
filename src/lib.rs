pub mod api;
pub mod auth;
pub mod authz;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reclaim;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::TokenService;
use crate::authz::GhostRegistry;
use crate::config::Config;
use crate::db::BoardRouter;
use crate::reclaim::start_reclaim_task;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub boards: Arc<BoardRouter>,
    pub tokens: TokenService,
    pub ghosts: GhostRegistry,
    pub config: Arc<Config>,
}

impl AppState {
    /// State over the bundled in-memory partitions, with indexes declared.
    /// This is what the server uses and what the integration tests drive.
    pub async fn bootstrap(config: Config) -> Result<Self> {
        let boards = Arc::new(BoardRouter::in_memory());
        boards
            .ensure_indexes()
            .await
            .map_err(|e| anyhow::anyhow!("index creation failed: {e}"))?;

        let tokens = TokenService::new(
            &config.auth.jwt_secret,
            config.auth.access_token_minutes,
            config.auth.refresh_token_days,
        );

        Ok(AppState {
            boards,
            tokens,
            ghosts: GhostRegistry::new(),
            config: Arc::new(config),
        })
    }
}

/// Build the application router around a prepared state
pub fn app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server
pub async fn run(config: Config) -> Result<()> {
    let state = AppState::bootstrap(config).await?;

    tracing::info!(
        "Provisioned {} boards across isolated partitions",
        state.boards.boards().len()
    );
    for board in state.boards.boards() {
        tracing::info!(board_id = %board.id, cluster = %board.cluster, "board ready");
    }

    if state.config.moderation.reclaim_enabled {
        start_reclaim_task(state.boards.clone(), state.config.clone());
        tracing::info!(
            "Reclamation task started (interval: {}s, dormant after: {}h)",
            state.config.moderation.reclaim_interval_secs,
            state.config.moderation.dormant_after_hours
        );
    }

    let addr: SocketAddr =
        format!("{}:{}", state.config.server.host, state.config.server.port).parse()?;
    let config = state.config.clone();
    let router = app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("neobbs listening on {}", addr);
    tracing::info!(
        "Access tokens: {}min, refresh: {}d, default lock: {}h",
        config.auth.access_token_minutes,
        config.auth.refresh_token_days,
        config.moderation.default_lock_hours
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Build CORS layer from configuration
fn build_cors_layer(origins: &str) -> CorsLayer {
    if origins == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;

        let origins: Vec<_> = origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
