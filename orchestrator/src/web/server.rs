// File: orchestrator/src/web/server.rs
use crate::web::{handlers, AppState};
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub async fn start_web_server(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // === BACKUP ROUTES ===
        .route(
            "/api/backups",
            get(handlers::list_backups).post(handlers::create_backup),
        )
        .route(
            "/api/backups/{file_name}",
            get(handlers::get_backup_info).delete(handlers::delete_backup),
        )
        .route(
            "/api/backups/{file_name}/download",
            get(handlers::download_backup),
        )
        .route(
            "/api/backups/{file_name}/restore",
            post(handlers::restore_backup),
        )
        // === LIVENESS ===
        .route("/health", get(handlers::health))
        // Add middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
