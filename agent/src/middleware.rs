//! Internal-trust guard for the contract endpoints.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Json as ResponseJson,
};
use std::sync::Arc;
use tracing::warn;

use crate::types::{ContractResponse, INTERNAL_SECRET_HEADER, TENANT_HEADER};
use crate::AppState;

pub type Rejection = (StatusCode, ResponseJson<ContractResponse<()>>);

/// Extractor that checks the internal secret header and yields the tenant the
/// call is scoped to.
///
/// # Example
/// ```ignore
/// async fn export(
///     InternalTrust { tenant_id }: InternalTrust,
///     State(state): State<Arc<AppState>>,
/// ) -> ... {
///     // caller is trusted, tenant_id is non-empty
/// }
/// ```
pub struct InternalTrust {
    pub tenant_id: String,
}

impl FromRequestParts<Arc<AppState>> for InternalTrust {
    type Rejection = Rejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let secret = parts
            .headers
            .get(INTERNAL_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());

        if secret != Some(state.internal_secret.as_str()) {
            warn!("Rejected internal call to {} without valid secret", parts.uri.path());
            return Err((
                StatusCode::UNAUTHORIZED,
                ResponseJson(ContractResponse::error("Invalid internal secret".to_string())),
            ));
        }

        match parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
        {
            Some(tenant) if !tenant.is_empty() => Ok(InternalTrust {
                tenant_id: tenant.to_string(),
            }),
            _ => Err((
                StatusCode::BAD_REQUEST,
                ResponseJson(ContractResponse::error(format!(
                    "Missing {} header",
                    TENANT_HEADER
                ))),
            )),
        }
    }
}
