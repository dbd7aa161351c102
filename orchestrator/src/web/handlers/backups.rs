// Backup management endpoints

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use tracing::info;

use super::common::{error_response, ApiResponse, ApiResult, CreateBackupRequest};
use crate::constants::snapshot::CONTENT_TYPE;
use crate::services::{BackupListing, CreatedSnapshot, RestoreReport};
use crate::snapshot::SnapshotSummary;
use crate::web::auth::AdminRequest;
use crate::web::AppState;

/// List all backups of the tenant, newest first
pub async fn list_backups(admin: AdminRequest, State(state): State<AppState>) -> ApiResult<Vec<BackupListing>> {
    match state.backup_service.list_backups(&admin.tenant_id).await {
        Ok(backups) => Ok(Json(ApiResponse::success(backups))),
        Err(e) => Err(error_response("Listing backups", e)),
    }
}

/// Create a backup of the tenant
pub async fn create_backup(
    admin: AdminRequest,
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<CreatedSnapshot> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CreateBackupRequest::default()
    } else {
        serde_json::from_slice::<CreateBackupRequest>(&body).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!("Invalid request body: {}", e))),
            )
        })?
    };

    match state
        .backup_service
        .create_backup(&admin.tenant_id, request.description, admin.operator)
        .await
    {
        Ok(created) => {
            info!("Backup {} created for {}", created.file_name, admin.tenant_id);
            Ok(Json(ApiResponse::success(created)))
        }
        Err(e) => Err(error_response("Creating backup", e)),
    }
}

/// Header and per-collection counts of one backup
pub async fn get_backup_info(
    Path(file_name): Path<String>,
    admin: AdminRequest,
    State(state): State<AppState>,
) -> ApiResult<SnapshotSummary> {
    match state.backup_service.backup_info(&admin.tenant_id, &file_name).await {
        Ok(summary) => Ok(Json(ApiResponse::success(summary))),
        Err(e) => Err(error_response("Reading backup info", e)),
    }
}

/// Raw snapshot document
pub async fn download_backup(
    Path(file_name): Path<String>,
    admin: AdminRequest,
    State(state): State<AppState>,
) -> Result<Response, (StatusCode, Json<ApiResponse<()>>)> {
    let bytes = state
        .backup_service
        .download_backup(&admin.tenant_id, &file_name)
        .await
        .map_err(|e| error_response("Downloading backup", e))?;

    Ok((
        [
            (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Delete a backup; deleting one that is already gone succeeds
pub async fn delete_backup(
    Path(file_name): Path<String>,
    admin: AdminRequest,
    State(state): State<AppState>,
) -> ApiResult<Value> {
    match state.backup_service.delete_backup(&admin.tenant_id, &file_name).await {
        Ok(removed) => Ok(Json(ApiResponse::success(json!({
            "fileName": file_name,
            "deleted": removed,
        })))),
        Err(e) => Err(error_response("Deleting backup", e)),
    }
}

/// Replace the tenant's data with the contents of a backup
pub async fn restore_backup(
    Path(file_name): Path<String>,
    admin: AdminRequest,
    State(state): State<AppState>,
) -> ApiResult<RestoreReport> {
    info!("Restore of {} requested by {:?}", file_name, admin.operator);

    match state
        .backup_service
        .restore_backup(&admin.tenant_id, &file_name, admin.operator)
        .await
    {
        Ok(report) => Ok(Json(ApiResponse::success(report))),
        Err(e) => Err(error_response("Restoring backup", e)),
    }
}
