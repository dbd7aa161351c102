// File: orchestrator/src/web/auth.rs
//! Admin authentication for the backup API.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::Json,
};
use domain_agent::types::{OperatorIdentity, TENANT_HEADER};
use tracing::warn;

use super::handlers::common::ApiResponse;
use super::AppState;
use crate::snapshot::naming::validate_tenant;

pub type Rejection = (StatusCode, Json<ApiResponse<()>>);

/// A request carrying the admin bearer token, scoped to one tenant.
///
/// The operator is whoever the caller says performs the operation
/// (`x-operator-id` / `x-operator-email`); it is used for identity continuity
/// on restore and for labelling running operations.
#[derive(Debug, Clone)]
pub struct AdminRequest {
    pub tenant_id: String,
    pub operator: Option<OperatorIdentity>,
}

fn reject(status: StatusCode, message: String) -> Rejection {
    (status, Json(ApiResponse::error(message)))
}

fn tokens_match(given: &[u8], expected: &[u8]) -> bool {
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

impl FromRequestParts<AppState> for AdminRequest {
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        let authorized = token.is_some_and(|t| tokens_match(t.as_bytes(), state.admin_token.as_bytes()));
        if !authorized {
            warn!("Rejected admin call to {} without valid token", parts.uri.path());
            return Err(reject(StatusCode::UNAUTHORIZED, "Invalid or missing admin token".to_string()));
        }

        let tenant_id = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| reject(StatusCode::BAD_REQUEST, format!("Missing {} header", TENANT_HEADER)))?;

        validate_tenant(tenant_id).map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?;

        Ok(AdminRequest {
            tenant_id: tenant_id.to_string(),
            operator: OperatorIdentity::from_headers(&parts.headers),
        })
    }
}
