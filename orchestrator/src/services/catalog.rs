// File: orchestrator/src/services/catalog.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::blob::{BlobError, BlobStore};
use crate::cache::TtlCache;
use crate::constants::snapshot::{FILE_PREFIX, FILE_SUFFIX};
use crate::errors::Result;
use crate::snapshot::naming::{backups_prefix, object_key, parse_file_name, validate_file_name, validate_tenant};
use crate::snapshot::{read_description, rfc3339_millis, SnapshotSummary};

/// One stored backup as shown in a listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupListing {
    pub file_name: String,
    /// `None` when the file name does not carry a readable timestamp.
    #[serde(with = "rfc3339_millis::option")]
    pub created_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub size: u64,
}

/// Listings per tenant id.
pub type ListingCache = TtlCache<String, Vec<BackupListing>>;

pub struct SnapshotCatalog {
    blob_store: Arc<dyn BlobStore>,
    listing_cache: Arc<ListingCache>,
}

impl SnapshotCatalog {
    pub fn new(blob_store: Arc<dyn BlobStore>, listing_cache: Arc<ListingCache>) -> Self {
        Self {
            blob_store,
            listing_cache,
        }
    }

    /// Newest first; backups without a readable timestamp last.
    pub async fn list(&self, tenant_id: &str) -> Result<Vec<BackupListing>> {
        validate_tenant(tenant_id)?;
        let cache_key = tenant_id.to_string();
        if let Some(cached) = self.listing_cache.get(&cache_key).await {
            debug!("Serving cached backup listing for tenant {}", tenant_id);
            return Ok(cached);
        }
        let generation = self.listing_cache.generation(&cache_key).await;

        let prefix = backups_prefix(tenant_id);
        let entries = self.blob_store.list(&prefix).await?;

        let mut listings = Vec::new();
        for entry in entries {
            let Some(file_name) = entry.key.strip_prefix(&prefix) else {
                continue;
            };
            if file_name.contains('/') || !file_name.starts_with(FILE_PREFIX) || !file_name.ends_with(FILE_SUFFIX) {
                continue;
            }

            let created_at = parse_file_name(file_name);
            if created_at.is_none() {
                warn!("Backup {} has no readable timestamp in its name", entry.key);
            }

            let description = match self.blob_store.get(&entry.key).await {
                Ok(bytes) => read_description(&bytes),
                Err(e) => {
                    warn!("Could not read description of {}: {}", entry.key, e);
                    None
                }
            };

            listings.push(BackupListing {
                file_name: file_name.to_string(),
                created_at,
                description,
                size: entry.size,
            });
        }

        sort_newest_first(&mut listings);
        if !self
            .listing_cache
            .insert_unless_invalidated(cache_key, listings.clone(), generation)
            .await
        {
            debug!("Backup listing for tenant {} changed while listing, not cached", tenant_id);
        }
        Ok(listings)
    }

    pub async fn info(&self, tenant_id: &str, file_name: &str) -> Result<SnapshotSummary> {
        let bytes = self.download(tenant_id, file_name).await?;
        let mut summary = SnapshotSummary::read(&bytes)?;
        if summary.created_at.is_none() {
            summary.created_at = parse_file_name(file_name);
        }
        Ok(summary)
    }

    pub async fn download(&self, tenant_id: &str, file_name: &str) -> Result<Vec<u8>> {
        validate_tenant(tenant_id)?;
        validate_file_name(file_name)?;
        Ok(self.blob_store.get(&object_key(tenant_id, file_name)).await?)
    }

    /// Deleting a backup that is already gone succeeds; the return value
    /// tells whether anything was removed.
    pub async fn delete(&self, tenant_id: &str, file_name: &str) -> Result<bool> {
        validate_tenant(tenant_id)?;
        validate_file_name(file_name)?;

        let key = object_key(tenant_id, file_name);
        let removed = match self.blob_store.delete(&key).await {
            Ok(()) => {
                info!("Deleted backup {}", key);
                true
            }
            Err(BlobError::NotFound(_)) => {
                info!("Backup {} already absent", key);
                false
            }
            Err(e) => return Err(e.into()),
        };

        self.listing_cache.invalidate(&tenant_id.to_string()).await;
        Ok(removed)
    }
}

fn sort_newest_first(listings: &mut [BackupListing]) {
    listings.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(a_at), Some(b_at)) => b_at.cmp(&a_at),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.file_name.cmp(&b.file_name),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{BlobEntry, MemoryBlobStore};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Lets a backup be created right after the catalog took its key listing.
    struct RacingStore {
        inner: MemoryBlobStore,
        cache: Arc<ListingCache>,
        pending: Mutex<Option<String>>,
    }

    #[async_trait]
    impl BlobStore for RacingStore {
        fn is_configured(&self) -> bool {
            true
        }

        async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> std::result::Result<(), BlobError> {
            self.inner.put(key, bytes, content_type).await
        }

        async fn get(&self, key: &str) -> std::result::Result<Vec<u8>, BlobError> {
            self.inner.get(key).await
        }

        async fn list(&self, prefix: &str) -> std::result::Result<Vec<BlobEntry>, BlobError> {
            let entries = self.inner.list(prefix).await?;
            if let Some(key) = self.pending.lock().await.take() {
                self.inner.put(&key, b"{}".to_vec(), "application/json").await?;
                self.cache.invalidate(&"acme".to_string()).await;
            }
            Ok(entries)
        }

        async fn delete(&self, key: &str) -> std::result::Result<(), BlobError> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn listing_taken_before_a_concurrent_create_is_not_cached() {
        let cache = Arc::new(ListingCache::new(Duration::from_secs(60)));
        let store = Arc::new(RacingStore {
            inner: MemoryBlobStore::new(),
            cache: cache.clone(),
            pending: Mutex::new(Some("acme/backups/backup_2025-01-15T10-30-00-123Z.json".to_string())),
        });
        let catalog = SnapshotCatalog::new(store, cache);

        assert!(catalog.list("acme").await.unwrap().is_empty());

        let listed = catalog.list("acme").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_name, "backup_2025-01-15T10-30-00-123Z.json");
    }

    fn listing(file_name: &str) -> BackupListing {
        BackupListing {
            file_name: file_name.to_string(),
            created_at: parse_file_name(file_name),
            description: None,
            size: 0,
        }
    }

    #[test]
    fn unreadable_names_sort_last() {
        let mut listings = vec![
            listing("backup_garbage.json"),
            listing("backup_2025-01-15T10-30-00-123Z.json"),
            listing("backup_2025-02-01T00-00-00-000Z.json"),
        ];
        sort_newest_first(&mut listings);
        let order: Vec<&str> = listings.iter().map(|l| l.file_name.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "backup_2025-02-01T00-00-00-000Z.json",
                "backup_2025-01-15T10-30-00-123Z.json",
                "backup_garbage.json",
            ]
        );
    }

    #[test]
    fn listing_serializes_missing_timestamp_as_null() {
        let value = serde_json::to_value(listing("backup_garbage.json")).unwrap();
        assert!(value["createdAt"].is_null());
        assert_eq!(value["fileName"], "backup_garbage.json");
    }
}
