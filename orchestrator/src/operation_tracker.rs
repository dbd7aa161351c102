//! Per-tenant operation tracking
//!
//! Creating and restoring backups for the same tenant are mutually exclusive:
//! a restore must not race a snapshot of the data it is replacing, and two
//! restores must not interleave their wipes. Different tenants never block
//! each other.
//!
//! # Usage
//!
//! ```ignore
//! let tracker = Arc::new(TenantOperationTracker::new());
//! let report = tracker
//!     .run_exclusive("acme", operations::RESTORE, Some("admin@acme.io".into()), async move {
//!         restore.restore(&tenant, &file, operator).await
//!     })
//!     .await?;
//! ```
//!
//! The work runs on its own task, so an administrator disconnecting mid-way
//! neither aborts a half-done restore nor leaves the tenant marked busy.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument};

use crate::errors::OrchestratorError;

#[derive(Debug, Clone, Serialize)]
pub struct ActiveOperation {
    pub operation_type: String,
    pub tenant_id: String,
    pub started_at: DateTime<Utc>,
    pub user_info: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationStatus {
    pub busy_tenants: HashMap<String, ActiveOperation>,
    pub total_active: usize,
}

#[derive(Default)]
pub struct TenantOperationTracker {
    active_operations: RwLock<HashMap<String, ActiveOperation>>, // tenant_id -> operation
}

fn format_elapsed(started_at: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(started_at);
    if duration.num_hours() > 0 {
        format!("{}h {}m", duration.num_hours(), duration.num_minutes() % 60)
    } else if duration.num_minutes() > 0 {
        format!("{}m", duration.num_minutes())
    } else {
        format!("{}s", duration.num_seconds().max(0))
    }
}

impl TenantOperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `tenant_id` busy with `operation_type`, or report what it is busy with.
    #[instrument(skip(self), fields(tenant = %tenant_id, operation = %operation_type))]
    pub async fn try_start_operation(
        &self,
        tenant_id: &str,
        operation_type: &str,
        user_info: Option<String>,
    ) -> Result<(), OrchestratorError> {
        let mut active = self.active_operations.write().await;

        if let Some(current_op) = active.get(tenant_id) {
            return Err(OrchestratorError::Busy {
                tenant: tenant_id.to_string(),
                operation: current_op.operation_type.clone(),
                elapsed: format_elapsed(current_op.started_at),
            });
        }

        active.insert(
            tenant_id.to_string(),
            ActiveOperation {
                operation_type: operation_type.to_string(),
                tenant_id: tenant_id.to_string(),
                started_at: Utc::now(),
                user_info,
            },
        );
        info!("Started operation '{}' for tenant {}", operation_type, tenant_id);
        Ok(())
    }

    #[instrument(skip(self), fields(tenant = %tenant_id))]
    pub async fn finish_operation(&self, tenant_id: &str) {
        let mut active = self.active_operations.write().await;
        if let Some(op) = active.remove(tenant_id) {
            info!(
                "Finished operation '{}' for tenant {} (took {})",
                op.operation_type,
                tenant_id,
                format_elapsed(op.started_at)
            );
        }
    }

    /// Run `work` while holding the tenant's slot; the slot is released when
    /// the work completes, whatever the outcome.
    pub async fn run_exclusive<F, T>(
        self: &Arc<Self>,
        tenant_id: &str,
        operation_type: &str,
        user_info: Option<String>,
        work: F,
    ) -> Result<T, OrchestratorError>
    where
        F: Future<Output = Result<T, OrchestratorError>> + Send + 'static,
        T: Send + 'static,
    {
        self.try_start_operation(tenant_id, operation_type, user_info)
            .await?;

        let tracker = Arc::clone(self);
        let tenant = tenant_id.to_string();
        let handle = tokio::spawn(async move {
            let result = work.await;
            tracker.finish_operation(&tenant).await;
            result
        });

        match handle.await {
            Ok(result) => result,
            Err(join_error) => {
                error!(
                    "Operation '{}' for tenant {} aborted: {}",
                    operation_type, tenant_id, join_error
                );
                self.finish_operation(tenant_id).await;
                Err(OrchestratorError::Internal(format!(
                    "operation '{}' aborted",
                    operation_type
                )))
            }
        }
    }

    pub async fn is_busy(&self, tenant_id: &str) -> bool {
        self.active_operations.read().await.contains_key(tenant_id)
    }

    pub async fn get_operation_status(&self) -> OperationStatus {
        let active = self.active_operations.read().await;
        OperationStatus {
            busy_tenants: active.clone(),
            total_active: active.len(),
        }
    }
}
