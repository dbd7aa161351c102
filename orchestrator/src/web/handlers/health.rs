// Liveness endpoint

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::web::AppState;

/// Liveness plus a little deployment context; never requires auth
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let operations = state.backup_service.operation_tracker().get_operation_status().await;
    Json(json!({
        "status": "ok",
        "topology": state.backup_service.topology(),
        "blobStorageConfigured": state.blob_store.is_configured(),
        "services": state.config.services.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        "activeOperations": operations.total_active,
    }))
}
