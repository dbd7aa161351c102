//! HTTP request handlers for the domain agent

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{HeaderMap, StatusCode},
    response::Json as ResponseJson,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::middleware::InternalTrust;
use crate::types::*;
use crate::AppState;

type ContractResult<T> = Result<ResponseJson<ContractResponse<T>>, (StatusCode, ResponseJson<ContractResponse<()>>)>;

fn failure(status: StatusCode, message: String) -> (StatusCode, ResponseJson<ContractResponse<()>>) {
    (status, ResponseJson(ContractResponse::error(message)))
}

// === Contract handlers ===

pub async fn export(
    InternalTrust { tenant_id }: InternalTrust,
    State(state): State<Arc<AppState>>,
) -> ContractResult<WireCollections> {
    info!("Export requested for tenant {}", tenant_id);

    match state.store.export(&tenant_id).await {
        Ok(data) => {
            let total: usize = data.values().map(Vec::len).sum();
            info!("Exported {} records for tenant {}", total, tenant_id);
            Ok(ResponseJson(ContractResponse::success(to_wire(&data))))
        }
        Err(e) => {
            error!("Export failed for tenant {}: {}", tenant_id, e);
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

pub async fn restore(
    InternalTrust { tenant_id }: InternalTrust,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<WireCollections>, JsonRejection>,
) -> ContractResult<WireCounts> {
    let Json(wire) = payload.map_err(|rejection| {
        warn!("Rejected restore body for tenant {}: {}", tenant_id, rejection.body_text());
        failure(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    let (data, unknown) = from_wire(wire);
    for name in &unknown {
        warn!("Ignoring unknown collection '{}' in restore for tenant {}", name, tenant_id);
    }

    let operator = OperatorIdentity::from_headers(&headers);
    info!(
        "Restore requested for tenant {} ({} collections supplied)",
        tenant_id,
        data.len()
    );

    match state.store.restore(&tenant_id, &data, operator.as_ref()).await {
        Ok(counts) => Ok(ResponseJson(ContractResponse::success(counts_to_wire(&counts)))),
        Err(e) => {
            error!("Restore failed for tenant {}: {}", tenant_id, e);
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// === Health ===

pub async fn health(State(state): State<Arc<AppState>>) -> ResponseJson<Value> {
    let collections: Vec<&str> = state.store.collections().iter().map(|c| c.name()).collect();
    ResponseJson(json!({
        "status": "ok",
        "collections": collections,
    }))
}
