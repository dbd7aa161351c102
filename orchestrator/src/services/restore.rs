// File: orchestrator/src/services/restore.rs
//! Replaying a stored snapshot into the tenant's data
//!
//! The snapshot is validated in full before anything destructive happens.
//! What follows depends on the deployment topology:
//!
//! - `single_store`: one transaction on the local store. Records that cannot
//!   be inserted are skipped; anything else rolls the whole restore back.
//! - `distributed`: one `POST /internal/restore` per domain service, parents
//!   first. A service that fails is reported and its records counted as
//!   skipped; the services after it are still restored.

use domain_agent::schema::Collection;
use domain_agent::types::{CollectionCounts, CollectionData, OperatorIdentity, WireCounts};
use domain_agent::TenantStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::blob::BlobStore;
use crate::config::Topology;
use crate::errors::Result;
use crate::http::DomainServiceClient;
use crate::snapshot::naming::{object_key, validate_file_name, validate_tenant};
use crate::snapshot::Snapshot;

/// Where restored data goes.
pub enum RestoreTarget {
    SingleStore(Arc<TenantStore>),
    /// Clients in dispatch order.
    Distributed(Vec<Arc<dyn DomainServiceClient>>),
}

impl RestoreTarget {
    pub fn topology(&self) -> Topology {
        match self {
            RestoreTarget::SingleStore(_) => Topology::SingleStore,
            RestoreTarget::Distributed(_) => Topology::Distributed,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailedService {
    pub service: String,
    pub error: String,
    pub collections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub topology: Topology,
    pub restored_counts: BTreeMap<String, u64>,
    pub skipped_counts: BTreeMap<String, u64>,
    pub failed_services: Vec<FailedService>,
}

impl RestoreReport {
    fn new(topology: Topology) -> Self {
        Self {
            topology,
            restored_counts: BTreeMap::new(),
            skipped_counts: BTreeMap::new(),
            failed_services: Vec::new(),
        }
    }

    fn record(&mut self, collection: Collection, counts: CollectionCounts) {
        let name = collection.name().to_string();
        *self.restored_counts.entry(name.clone()).or_default() += counts.restored;
        *self.skipped_counts.entry(name).or_default() += counts.skipped;
    }

    pub fn total_restored(&self) -> u64 {
        self.restored_counts.values().sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.skipped_counts.values().sum()
    }
}

pub struct RestoreOrchestrator {
    blob_store: Arc<dyn BlobStore>,
    target: RestoreTarget,
}

impl RestoreOrchestrator {
    pub fn new(blob_store: Arc<dyn BlobStore>, target: RestoreTarget) -> Self {
        Self { blob_store, target }
    }

    pub fn topology(&self) -> Topology {
        self.target.topology()
    }

    pub async fn restore(
        &self,
        tenant_id: &str,
        file_name: &str,
        operator: Option<OperatorIdentity>,
    ) -> Result<RestoreReport> {
        validate_tenant(tenant_id)?;
        validate_file_name(file_name)?;

        let key = object_key(tenant_id, file_name);
        let bytes = self.blob_store.get(&key).await?;
        let snapshot = Snapshot::parse(&bytes, tenant_id)?;

        info!(
            "Restoring {} (version {}, {} records) into tenant {} via {}",
            key,
            snapshot.version,
            snapshot.total_records(),
            tenant_id,
            self.topology().as_str()
        );

        let report = match &self.target {
            RestoreTarget::SingleStore(store) => {
                restore_single_store(store, tenant_id, &snapshot.data, operator.as_ref()).await?
            }
            RestoreTarget::Distributed(clients) => {
                restore_distributed(clients, tenant_id, &snapshot.data, operator.as_ref()).await
            }
        };

        info!(
            "Restore of {} finished: {} restored, {} skipped, {} failed services",
            key,
            report.total_restored(),
            report.total_skipped(),
            report.failed_services.len()
        );
        Ok(report)
    }
}

async fn restore_single_store(
    store: &TenantStore,
    tenant_id: &str,
    data: &CollectionData,
    operator: Option<&OperatorIdentity>,
) -> Result<RestoreReport> {
    let counts = store.restore(tenant_id, data, operator).await?;

    let mut report = RestoreReport::new(Topology::SingleStore);
    for (collection, tally) in counts {
        report.record(collection, tally);
    }
    Ok(report)
}

async fn restore_distributed(
    clients: &[Arc<dyn DomainServiceClient>],
    tenant_id: &str,
    data: &CollectionData,
    operator: Option<&OperatorIdentity>,
) -> RestoreReport {
    let mut report = RestoreReport::new(Topology::Distributed);

    for client in clients {
        let owned: CollectionData = client
            .collections()
            .iter()
            .map(|collection| (*collection, data.get(collection).cloned().unwrap_or_default()))
            .collect();

        match client.restore(tenant_id, &owned, operator).await {
            Ok(reported) => record_service_counts(&mut report, client.name(), &owned, reported),
            Err(e) => {
                error!(
                    "Restore on {} failed for tenant {}, continuing with the remaining services: {}",
                    client.name(),
                    tenant_id,
                    e
                );
                for (collection, records) in &owned {
                    report.record(*collection, CollectionCounts::skipped(records.len() as u64));
                }
                report.failed_services.push(FailedService {
                    service: client.name().to_string(),
                    error: e.to_string(),
                    collections: owned.keys().map(|c| c.name().to_string()).collect(),
                });
            }
        }
    }

    report
}

fn record_service_counts(report: &mut RestoreReport, service: &str, sent: &CollectionData, mut reported: WireCounts) {
    for (collection, records) in sent {
        match reported.remove(collection.name()) {
            Some(counts) => report.record(*collection, counts),
            None => {
                warn!(
                    "{} did not report counts for '{}', treating its {} records as skipped",
                    service,
                    collection,
                    records.len()
                );
                report.record(*collection, CollectionCounts::skipped(records.len() as u64));
            }
        }
    }
    for name in reported.keys() {
        warn!("{} reported counts for unexpected collection '{}'", service, name);
    }
}
