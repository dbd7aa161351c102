// File: orchestrator/src/config/mod.rs
pub mod manager;
pub mod secrets;

use domain_agent::schema::Collection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::defaults;
use crate::errors::ConfigError;

pub use manager::ConfigManager;
pub use secrets::{Secrets, SecretsLoader};

/// How tenant data is laid out, which decides how a restore is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Every collection lives in one local SQLite store; restores are one
    /// transaction with record-level skips.
    SingleStore,
    /// Each domain service owns its collections; restores are dispatched
    /// service by service, best effort.
    Distributed,
}

impl Topology {
    pub fn as_str(self) -> &'static str {
        match self {
            Topology::SingleStore => "single_store",
            Topology::Distributed => "distributed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub topology: Topology,
    /// Directory blobs are stored under; absent means blob storage is off.
    pub blob_root: Option<PathBuf>,
    /// SQLite file of the single store.
    pub database_path: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_list_cache_ttl")]
    pub list_cache_ttl_seconds: u64,
    // Populated from config/services/*.toml, in dispatch order
    #[serde(skip)]
    pub services: Vec<ServiceConfig>,
}

fn default_host() -> String {
    defaults::HOST.to_string()
}

fn default_port() -> u16 {
    defaults::PORT
}

fn default_request_timeout() -> u64 {
    defaults::REQUEST_TIMEOUT_SECONDS
}

fn default_connect_timeout() -> u64 {
    defaults::CONNECT_TIMEOUT_SECONDS
}

fn default_list_cache_ttl() -> u64 {
    defaults::LIST_CACHE_TTL_SECONDS
}

/// One domain service and the collections it owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    #[serde(skip)]
    pub name: String,
    pub base_url: String,
    pub collections: Vec<Collection>,
}

impl ServiceConfig {
    /// Lowest restore rank among owned collections.
    pub fn dispatch_rank(&self) -> usize {
        self.collections
            .iter()
            .map(|c| c.rank())
            .min()
            .unwrap_or(usize::MAX)
    }

    pub fn owns(&self, collection: Collection) -> bool {
        self.collections.contains(&collection)
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn list_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.list_cache_ttl_seconds)
    }

    /// Sort services so that parents are restored before children.
    pub fn order_services(&mut self) {
        for service in &mut self.services {
            service.collections.sort();
            service.collections.dedup();
        }
        self.services
            .sort_by(|a, b| a.dispatch_rank().cmp(&b.dispatch_rank()).then_with(|| a.name.cmp(&b.name)));
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_seconds".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.connect_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout_seconds".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        match self.topology {
            Topology::SingleStore => {
                if self.database_path.as_deref().unwrap_or_default().is_empty() {
                    return Err(ConfigError::MissingRequired {
                        field: "database_path".to_string(),
                    });
                }
                Ok(())
            }
            Topology::Distributed => self.validate_services(),
        }
    }

    fn validate_services(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "services".to_string(),
            });
        }

        let mut owners: BTreeMap<Collection, &str> = BTreeMap::new();
        for service in &self.services {
            if !(service.base_url.starts_with("http://") || service.base_url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.base_url", service.name),
                    reason: format!("'{}' is not an http(s) URL", service.base_url),
                });
            }
            if service.collections.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.collections", service.name),
                    reason: "a service must own at least one collection".to_string(),
                });
            }
            for collection in &service.collections {
                if let Some(other) = owners.insert(*collection, &service.name) {
                    return Err(ConfigError::InvalidValue {
                        field: format!("{}.collections", service.name),
                        reason: format!("'{}' is already owned by '{}'", collection, other),
                    });
                }
            }
        }

        if let Some(missing) = Collection::ALL.iter().find(|c| !owners.contains_key(c)) {
            return Err(ConfigError::MissingRequired {
                field: format!("owner of collection '{}'", missing),
            });
        }

        // Every dependency must be owned by the same service or one dispatched earlier.
        for (position, service) in self.services.iter().enumerate() {
            for collection in &service.collections {
                for dependency in collection.dependencies() {
                    let dispatched_before = self.services[..=position]
                        .iter()
                        .any(|s| s.owns(dependency));
                    if !dispatched_before {
                        return Err(ConfigError::InvalidValue {
                            field: format!("{}.collections", service.name),
                            reason: format!(
                                "'{}' depends on '{}', owned by '{}' which is restored later",
                                collection,
                                dependency,
                                owners.get(&dependency).copied().unwrap_or("nobody")
                            ),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
