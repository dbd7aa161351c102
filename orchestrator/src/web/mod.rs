// File: orchestrator/src/web/mod.rs
pub mod auth;
pub mod handlers;
pub mod server;

pub use server::{create_router, start_web_server};

use anyhow::{Context, Result};
use domain_agent::schema::Collection;
use domain_agent::TenantStore;
use std::sync::Arc;
use tracing::info;

use crate::blob::{BlobStore, FsBlobStore};
use crate::config::{Config, ConfigManager, Topology};
use crate::http::{build_http_client, DomainServiceClient, HttpDomainClient};
use crate::services::{BackupService, RestoreTarget};

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub admin_token: Arc<str>,
    pub blob_store: Arc<dyn BlobStore>,
    pub backup_service: Arc<BackupService>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        admin_token: &str,
        blob_store: Arc<dyn BlobStore>,
        backup_service: Arc<BackupService>,
    ) -> Self {
        Self {
            config,
            admin_token: Arc::from(admin_token),
            blob_store,
            backup_service,
        }
    }

    /// Build the full application from loaded configuration.
    pub async fn from_config(config_manager: &ConfigManager) -> Result<Self> {
        let config = config_manager.get_current_config();
        let secrets = config_manager.get_secrets();

        let blob_store: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.blob_root.clone()));

        let target = match config.topology {
            Topology::SingleStore => {
                let database_path = config
                    .database_path
                    .as_deref()
                    .context("single_store topology requires database_path")?;
                let store = TenantStore::open(database_path, &Collection::ALL)
                    .await
                    .with_context(|| format!("Failed to open tenant store at {}", database_path))?;
                info!("Opened single store at {}", database_path);
                RestoreTarget::SingleStore(Arc::new(store))
            }
            Topology::Distributed => {
                let internal_secret = secrets.internal_secret()?;
                let client = build_http_client(config.request_timeout(), config.connect_timeout())?;
                let clients: Vec<Arc<dyn DomainServiceClient>> = config
                    .services
                    .iter()
                    .map(|service| {
                        let client: Arc<dyn DomainServiceClient> =
                            Arc::new(HttpDomainClient::new(service, internal_secret, client.clone()));
                        client
                    })
                    .collect();
                RestoreTarget::Distributed(clients)
            }
        };

        let backup_service = Arc::new(BackupService::assemble(
            blob_store.clone(),
            target,
            config.list_cache_ttl(),
        ));

        Ok(Self::new(config, secrets.admin_token()?, blob_store, backup_service))
    }
}
