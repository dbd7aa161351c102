//! Domain-service side of the tenant export/restore contract.
//!
//! Holds the collection schema every party agrees on, a tenant-scoped store
//! that can export and replay any subset of collections, and the two internal
//! endpoints a domain service exposes to the backup orchestrator.

pub mod handlers;
pub mod middleware;
pub mod schema;
pub mod store;
pub mod types;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use schema::Collection;
pub use store::{StoreError, TenantStore};

/// Largest restore body accepted. A restore takes back whatever an export
/// produced, so this sits far above axum's 2 MB default.
pub const MAX_RESTORE_BODY_BYTES: usize = 512 * 1024 * 1024;

pub struct AppState {
    pub internal_secret: String,
    pub store: TenantStore,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/internal/export", get(handlers::export))
        .route(
            "/internal/restore",
            post(handlers::restore).layer(DefaultBodyLimit::max(MAX_RESTORE_BODY_BYTES)),
        )
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
