// File: orchestrator/src/services/backup_service.rs
use domain_agent::types::OperatorIdentity;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::blob::BlobStore;
use crate::config::Topology;
use crate::constants::operations;
use crate::errors::Result;
use crate::http::{DomainServiceClient, LocalStoreClient};
use crate::operation_tracker::TenantOperationTracker;
use crate::services::builder::{CreatedSnapshot, SnapshotBuilder};
use crate::services::catalog::{BackupListing, ListingCache, SnapshotCatalog};
use crate::services::restore::{RestoreOrchestrator, RestoreReport, RestoreTarget};
use crate::snapshot::SnapshotSummary;

/// Entry point of every administrative backup operation.
///
/// Creating and restoring run under the per-tenant operation guard; reads and
/// deletes do not.
#[derive(Clone)]
pub struct BackupService {
    builder: Arc<SnapshotBuilder>,
    catalog: Arc<SnapshotCatalog>,
    restorer: Arc<RestoreOrchestrator>,
    operation_tracker: Arc<TenantOperationTracker>,
}

impl BackupService {
    pub fn new(
        builder: Arc<SnapshotBuilder>,
        catalog: Arc<SnapshotCatalog>,
        restorer: Arc<RestoreOrchestrator>,
        operation_tracker: Arc<TenantOperationTracker>,
    ) -> Self {
        Self {
            builder,
            catalog,
            restorer,
            operation_tracker,
        }
    }

    /// Wire builder, catalog and restorer around one blob store and one
    /// restore target. Exports go to the same place restores do.
    pub fn assemble(blob_store: Arc<dyn BlobStore>, target: RestoreTarget, list_cache_ttl: Duration) -> Self {
        let listing_cache = Arc::new(ListingCache::new(list_cache_ttl));
        let export_clients: Vec<Arc<dyn DomainServiceClient>> = match &target {
            RestoreTarget::SingleStore(store) => {
                let local: Arc<dyn DomainServiceClient> = Arc::new(LocalStoreClient::new(store.clone()));
                vec![local]
            }
            RestoreTarget::Distributed(clients) => clients.clone(),
        };

        Self::new(
            Arc::new(SnapshotBuilder::new(
                export_clients,
                blob_store.clone(),
                listing_cache.clone(),
            )),
            Arc::new(SnapshotCatalog::new(blob_store.clone(), listing_cache)),
            Arc::new(RestoreOrchestrator::new(blob_store, target)),
            Arc::new(TenantOperationTracker::new()),
        )
    }

    pub fn topology(&self) -> Topology {
        self.restorer.topology()
    }

    pub fn operation_tracker(&self) -> &Arc<TenantOperationTracker> {
        &self.operation_tracker
    }

    pub async fn create_backup(
        &self,
        tenant_id: &str,
        description: Option<String>,
        operator: Option<OperatorIdentity>,
    ) -> Result<CreatedSnapshot> {
        info!("Backup creation requested for tenant {}", tenant_id);
        let builder = self.builder.clone();
        let tenant = tenant_id.to_string();
        self.operation_tracker
            .run_exclusive(tenant_id, operations::CREATE, operator_label(operator.as_ref()), async move {
                builder.create(&tenant, description).await
            })
            .await
    }

    pub async fn list_backups(&self, tenant_id: &str) -> Result<Vec<BackupListing>> {
        self.catalog.list(tenant_id).await
    }

    pub async fn backup_info(&self, tenant_id: &str, file_name: &str) -> Result<SnapshotSummary> {
        self.catalog.info(tenant_id, file_name).await
    }

    pub async fn download_backup(&self, tenant_id: &str, file_name: &str) -> Result<Vec<u8>> {
        self.catalog.download(tenant_id, file_name).await
    }

    pub async fn delete_backup(&self, tenant_id: &str, file_name: &str) -> Result<bool> {
        info!("Deletion of backup {} requested for tenant {}", file_name, tenant_id);
        self.catalog.delete(tenant_id, file_name).await
    }

    pub async fn restore_backup(
        &self,
        tenant_id: &str,
        file_name: &str,
        operator: Option<OperatorIdentity>,
    ) -> Result<RestoreReport> {
        info!("Restore of {} requested for tenant {}", file_name, tenant_id);
        let restorer = self.restorer.clone();
        let tenant = tenant_id.to_string();
        let file = file_name.to_string();
        let label = operator_label(operator.as_ref());
        self.operation_tracker
            .run_exclusive(tenant_id, operations::RESTORE, label, async move {
                restorer.restore(&tenant, &file, operator).await
            })
            .await
    }
}

fn operator_label(operator: Option<&OperatorIdentity>) -> Option<String> {
    operator.and_then(|o| o.email.clone().or_else(|| o.user_id.clone()))
}
