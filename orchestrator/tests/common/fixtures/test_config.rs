//! Test configuration builder for creating test configs programmatically

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use super::test_data::{ADMIN_TOKEN, INTERNAL_SECRET};

/// Builder for creating test configuration directories
pub struct TestConfigBuilder {
    temp_dir: TempDir,
    main_config: MainConfigBuilder,
    services: BTreeMap<String, ServiceConfigBuilder>,
    secrets: Option<String>,
}

/// A written configuration directory; removed when dropped
pub struct TestConfig {
    _temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub blob_root: PathBuf,
}

impl TestConfig {
    pub fn config_dir_string(&self) -> String {
        self.config_dir.to_string_lossy().into_owned()
    }
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            main_config: MainConfigBuilder::default(),
            services: BTreeMap::new(),
            secrets: Some(format!(
                "admin_token = \"{}\"\ninternal_secret = \"{}\"\n",
                ADMIN_TOKEN, INTERNAL_SECRET
            )),
        }
    }

    /// Configure main settings
    pub fn with_main_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(MainConfigBuilder) -> MainConfigBuilder,
    {
        self.main_config = f(self.main_config);
        self
    }

    /// Add one `services/{name}.toml`
    pub fn with_service(mut self, name: &str, base_url: &str, collections: &[&str]) -> Self {
        self.services.insert(
            name.to_string(),
            ServiceConfigBuilder {
                base_url: base_url.to_string(),
                collections: collections.iter().map(|c| c.to_string()).collect(),
            },
        );
        self
    }

    /// Replace the secrets file contents; `None` writes no file
    pub fn with_secrets(mut self, secrets: Option<&str>) -> Self {
        self.secrets = secrets.map(str::to_string);
        self
    }

    /// Build and write config files to the temp directory
    pub fn build(self) -> TestConfig {
        let config_dir = self.temp_dir.path().join("config");
        let services_dir = config_dir.join("services");
        fs::create_dir_all(&services_dir).expect("Failed to create config dir");

        let blob_root = self.temp_dir.path().join("blobs");
        let database_path = self.temp_dir.path().join("data").join("platform.db");

        fs::write(
            config_dir.join("main.toml"),
            self.main_config.to_toml(&blob_root, &database_path),
        )
        .expect("Failed to write main.toml");

        for (name, service) in &self.services {
            fs::write(services_dir.join(format!("{}.toml", name)), service.to_toml())
                .expect("Failed to write service config");
        }

        if let Some(secrets) = &self.secrets {
            fs::write(config_dir.join("secrets.toml"), secrets).expect("Failed to write secrets.toml");
        }

        TestConfig {
            _temp_dir: self.temp_dir,
            config_dir,
            blob_root,
        }
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Main configuration builder
#[derive(Clone)]
pub struct MainConfigBuilder {
    topology: String,
    with_blob_root: bool,
    with_database: bool,
    request_timeout_seconds: u64,
    list_cache_ttl_seconds: u64,
}

impl MainConfigBuilder {
    pub fn topology(mut self, topology: &str) -> Self {
        self.topology = topology.to_string();
        self
    }

    pub fn without_blob_root(mut self) -> Self {
        self.with_blob_root = false;
        self
    }

    pub fn without_database(mut self) -> Self {
        self.with_database = false;
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    pub fn list_cache_ttl(mut self, seconds: u64) -> Self {
        self.list_cache_ttl_seconds = seconds;
        self
    }

    fn to_toml(&self, blob_root: &std::path::Path, database_path: &std::path::Path) -> String {
        let mut toml = format!(
            r#"
host = "127.0.0.1"
port = 0
topology = "{}"
request_timeout_seconds = {}
connect_timeout_seconds = 1
list_cache_ttl_seconds = {}
"#,
            self.topology, self.request_timeout_seconds, self.list_cache_ttl_seconds
        );
        if self.with_blob_root {
            toml.push_str(&format!("blob_root = {:?}\n", blob_root.to_string_lossy()));
        }
        if self.with_database {
            toml.push_str(&format!("database_path = {:?}\n", database_path.to_string_lossy()));
        }
        toml
    }
}

impl Default for MainConfigBuilder {
    fn default() -> Self {
        Self {
            topology: "single_store".to_string(),
            with_blob_root: true,
            with_database: true,
            request_timeout_seconds: 5,
            list_cache_ttl_seconds: 0,
        }
    }
}

struct ServiceConfigBuilder {
    base_url: String,
    collections: Vec<String>,
}

impl ServiceConfigBuilder {
    fn to_toml(&self) -> String {
        let collections = self
            .collections
            .iter()
            .map(|c| format!("{:?}", c))
            .collect::<Vec<_>>()
            .join(", ");
        format!("base_url = {:?}\ncollections = [{}]\n", self.base_url, collections)
    }
}
