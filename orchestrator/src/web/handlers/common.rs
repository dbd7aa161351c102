// Common types and utilities for API handlers

use axum::{http::StatusCode, response::Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::blob::BlobError;
use crate::errors::{OrchestratorError, SnapshotError};

// Helper type for API responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<&'static str>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            stage: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            stage: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn failure(err: &OrchestratorError) -> Self {
        Self {
            stage: Some(err.stage()),
            ..Self::error(err.to_string())
        }
    }
}

// Request bodies
#[derive(Debug, Default, Deserialize)]
pub struct CreateBackupRequest {
    #[serde(default)]
    pub description: Option<String>,
}

pub fn status_for(err: &OrchestratorError) -> StatusCode {
    match err {
        OrchestratorError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        OrchestratorError::Blob(blob) => match blob {
            BlobError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            BlobError::NotFound(_) => StatusCode::NOT_FOUND,
            BlobError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            BlobError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        },
        OrchestratorError::Snapshot(snapshot) => match snapshot {
            SnapshotError::InvalidFileName(_) | SnapshotError::InvalidTenant(_) => StatusCode::BAD_REQUEST,
            SnapshotError::Malformed(_)
            | SnapshotError::UnsupportedVersion(_)
            | SnapshotError::TenantMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        },
        OrchestratorError::ExportAggregation { .. } => StatusCode::BAD_GATEWAY,
        OrchestratorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        OrchestratorError::Busy { .. } => StatusCode::CONFLICT,
        OrchestratorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Log `err` and turn it into the response body every handler fails with.
pub fn error_response(context: &str, err: OrchestratorError) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("{} failed [{}]: {}", context, err.stage(), err);
    } else {
        warn!("{} rejected [{}]: {}", context, err.stage(), err);
    }
    (status, Json(ApiResponse::failure(&err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ServiceCallError, ServiceFailure};
    use rstest::rstest;

    #[rstest]
    #[case(OrchestratorError::Blob(BlobError::NotConfigured), StatusCode::SERVICE_UNAVAILABLE, "configuration")]
    #[case(OrchestratorError::Blob(BlobError::NotFound("k".into())), StatusCode::NOT_FOUND, "blob_io")]
    #[case(OrchestratorError::Snapshot(SnapshotError::UnsupportedVersion("9".into())), StatusCode::UNPROCESSABLE_ENTITY, "validation")]
    #[case(OrchestratorError::Snapshot(SnapshotError::InvalidFileName("x".into())), StatusCode::BAD_REQUEST, "validation")]
    #[case(
        OrchestratorError::ExportAggregation {
            failures: vec![ServiceFailure { service: "comments".into(), error: ServiceCallError::Timeout }],
        },
        StatusCode::BAD_GATEWAY,
        "export_aggregation"
    )]
    #[case(
        OrchestratorError::Busy { tenant: "acme".into(), operation: "backup_restore".into(), elapsed: "3s".into() },
        StatusCode::CONFLICT,
        "operation_guard"
    )]
    fn errors_map_to_status_and_stage(
        #[case] err: OrchestratorError,
        #[case] status: StatusCode,
        #[case] stage: &str,
    ) {
        assert_eq!(status_for(&err), status);
        let body = serde_json::to_value(ApiResponse::failure(&err)).unwrap();
        assert_eq!(body["stage"], stage);
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
    }
}
