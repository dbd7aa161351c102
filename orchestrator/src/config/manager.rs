// File: orchestrator/src/config/manager.rs
use super::{Config, Secrets, SecretsLoader, ServiceConfig, Topology};
use glob::glob;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

pub struct ConfigManager {
    current_config: Arc<Config>,
    secrets: Arc<Secrets>,
}

impl ConfigManager {
    pub async fn new(config_dir: String) -> Result<Self, ConfigError> {
        let config = Self::load_configuration(&config_dir).await?;
        let secrets = SecretsLoader::load(&Path::new(&config_dir).join("secrets.toml"))?;

        secrets.admin_token()?;
        if config.topology == Topology::Distributed {
            secrets.internal_secret()?;
        }

        Ok(Self {
            current_config: Arc::new(config),
            secrets: Arc::new(secrets),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    pub fn get_secrets(&self) -> Arc<Secrets> {
        self.secrets.clone()
    }

    async fn load_configuration(config_dir: &str) -> Result<Config, ConfigError> {
        let main_config_path = format!("{}/main.toml", config_dir);
        let main_config_content =
            fs::read_to_string(&main_config_path)
                .await
                .map_err(|e| ConfigError::LoadFailed {
                    path: main_config_path.clone(),
                    reason: e.to_string(),
                })?;

        let mut config: Config =
            toml::from_str(&main_config_content).map_err(|e| ConfigError::LoadFailed {
                path: main_config_path.clone(),
                reason: e.to_string(),
            })?;

        config.services = Self::load_services(config_dir).await?;
        if config.topology == Topology::SingleStore && !config.services.is_empty() {
            warn!(
                "Ignoring {} service definitions: single_store topology reads the local store",
                config.services.len()
            );
            config.services.clear();
        }

        config.order_services();
        config.validate()?;

        info!(
            "Loaded configuration: topology {}, {} services, blob storage {}",
            config.topology.as_str(),
            config.services.len(),
            if config.blob_root.is_some() { "configured" } else { "not configured" }
        );
        for service in &config.services {
            debug!(
                "Service {} at {} owns {}",
                service.name,
                service.base_url,
                service
                    .collections
                    .iter()
                    .map(|c| c.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Ok(config)
    }

    /// One file per domain service; the file stem is the service name.
    async fn load_services(config_dir: &str) -> Result<Vec<ServiceConfig>, ConfigError> {
        let pattern = format!("{}/services/*.toml", config_dir);
        let entries = glob(&pattern).map_err(|e| ConfigError::LoadFailed {
            path: pattern.clone(),
            reason: e.to_string(),
        })?;

        let mut services = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ConfigError::LoadFailed {
                path: pattern.clone(),
                reason: e.to_string(),
            })?;
            let service_name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| ConfigError::LoadFailed {
                    path: path.display().to_string(),
                    reason: "invalid file name".to_string(),
                })?
                .to_string();

            debug!("Loading service config: {}", path.display());

            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| ConfigError::LoadFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;

            let mut service: ServiceConfig =
                toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            service.name = service_name;
            service.base_url = service.base_url.trim_end_matches('/').to_string();
            services.push(service);
        }

        Ok(services)
    }
}
