// File: orchestrator/src/services/builder.rs
use chrono::{DateTime, Utc};
use domain_agent::schema::Collection;
use domain_agent::types::{from_wire, CollectionData, WireCollections};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::blob::{BlobError, BlobStore};
use crate::constants::snapshot::CONTENT_TYPE;
use crate::errors::{OrchestratorError, Result, ServiceFailure};
use crate::http::DomainServiceClient;
use crate::services::catalog::ListingCache;
use crate::snapshot::naming::{file_name_for, object_key, validate_tenant};
use crate::snapshot::{rfc3339_millis, Snapshot, SnapshotStats};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSnapshot {
    pub file_name: String,
    pub object_path: String,
    #[serde(with = "rfc3339_millis")]
    pub created_at: DateTime<Utc>,
    pub stats: SnapshotStats,
}

/// Collects every domain service's export of one tenant into one snapshot.
pub struct SnapshotBuilder {
    clients: Vec<Arc<dyn DomainServiceClient>>,
    blob_store: Arc<dyn BlobStore>,
    listing_cache: Arc<ListingCache>,
}

impl SnapshotBuilder {
    pub fn new(
        clients: Vec<Arc<dyn DomainServiceClient>>,
        blob_store: Arc<dyn BlobStore>,
        listing_cache: Arc<ListingCache>,
    ) -> Self {
        Self {
            clients,
            blob_store,
            listing_cache,
        }
    }

    pub async fn create(&self, tenant_id: &str, description: Option<String>) -> Result<CreatedSnapshot> {
        validate_tenant(tenant_id)?;
        if !self.blob_store.is_configured() {
            return Err(BlobError::NotConfigured.into());
        }

        info!(
            "Creating snapshot for tenant {} from {} services",
            tenant_id,
            self.clients.len()
        );

        // Every export runs to completion; one failure must not hide another.
        let exports = join_all(self.clients.iter().map(|client| async move {
            let result = client.export(tenant_id).await;
            (client, result)
        }))
        .await;

        let mut data = CollectionData::new();
        let mut failures = Vec::new();
        for (client, result) in exports {
            match result {
                Ok(wire) => merge_export(&mut data, client.name(), client.collections(), wire),
                Err(error) => {
                    error!("Export from {} failed for tenant {}: {}", client.name(), tenant_id, error);
                    failures.push(ServiceFailure {
                        service: client.name().to_string(),
                        error,
                    });
                }
            }
        }
        if !failures.is_empty() {
            return Err(OrchestratorError::ExportAggregation { failures });
        }

        let snapshot = Snapshot::new(tenant_id, description, Utc::now(), data);
        let bytes = snapshot.to_bytes()?;
        let file_name = file_name_for(snapshot.created_at);
        let object_path = object_key(tenant_id, &file_name);

        self.blob_store.put(&object_path, bytes, CONTENT_TYPE).await?;
        self.listing_cache.invalidate(&tenant_id.to_string()).await;

        info!(
            "Snapshot {} written for tenant {} ({} records)",
            object_path,
            tenant_id,
            snapshot.total_records()
        );

        Ok(CreatedSnapshot {
            file_name,
            object_path,
            created_at: snapshot.created_at,
            stats: snapshot.stats(),
        })
    }
}

/// Keep only the collections `service` is registered for.
fn merge_export(data: &mut CollectionData, service: &str, owned: &[Collection], wire: WireCollections) {
    let (mut exported, unknown) = from_wire(wire);
    for name in unknown {
        warn!("{} exported unknown collection '{}', ignoring it", service, name);
    }

    for collection in owned {
        match exported.remove(collection) {
            Some(records) => {
                data.insert(*collection, records);
            }
            None => {
                warn!("{} exported no '{}', recording it as empty", service, collection);
                data.insert(*collection, Vec::new());
            }
        }
    }
    for (collection, records) in exported {
        warn!(
            "{} exported {} '{}' records it does not own, ignoring them",
            service,
            records.len(),
            collection
        );
    }
}
