// File: orchestrator/src/config/secrets.rs
//! Secrets loader for the admin token and the internal-trust secret.
//!
//! Secrets are stored in a separate TOML file (config/secrets.toml) that should
//! be excluded from version control. Environment variables take precedence
//! over the file.
//!
//! Example secrets.toml:
//! ```toml
//! admin_token = "long-random-admin-token"
//! internal_secret = "shared-cluster-secret"
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

use crate::constants::env;
use crate::errors::ConfigError;

/// Structure matching the secrets.toml file format
#[derive(Deserialize, Default, Clone)]
pub struct Secrets {
    #[serde(default)]
    pub admin_token: Option<String>,
    #[serde(default)]
    pub internal_secret: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Secrets")
            .field("admin_token", &redact(&self.admin_token))
            .field("internal_secret", &redact(&self.internal_secret))
            .finish()
    }
}

impl Secrets {
    pub fn admin_token(&self) -> Result<&str, ConfigError> {
        self.admin_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "admin_token".to_string(),
            })
    }

    pub fn internal_secret(&self) -> Result<&str, ConfigError> {
        self.internal_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "internal_secret".to_string(),
            })
    }
}

/// Loader for secrets from the secrets.toml file
pub struct SecretsLoader;

impl SecretsLoader {
    /// Load secrets from the specified file path, then apply environment
    /// overrides. A missing file yields only what the environment provides.
    pub fn load(secrets_path: &Path) -> Result<Secrets, ConfigError> {
        let mut secrets = Self::load_file(secrets_path)?;
        Self::apply_env_overrides(&mut secrets, |name| std::env::var(name).ok());
        Ok(secrets)
    }

    fn load_file(secrets_path: &Path) -> Result<Secrets, ConfigError> {
        if !secrets_path.exists() {
            warn!(
                "Secrets file not found at {:?}, relying on environment variables",
                secrets_path
            );
            return Ok(Secrets::default());
        }

        let content = std::fs::read_to_string(secrets_path).map_err(|e| ConfigError::LoadFailed {
            path: secrets_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let secrets: Secrets = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: secrets_path.display().to_string(),
            reason: e.to_string(),
        })?;

        info!("Loaded secrets from {:?}", secrets_path);
        Ok(secrets)
    }

    fn apply_env_overrides(secrets: &mut Secrets, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(env::ADMIN_TOKEN).filter(|v| !v.is_empty()) {
            secrets.admin_token = Some(token);
        }
        if let Some(secret) = lookup(env::INTERNAL_SECRET).filter(|v| !v.is_empty()) {
            secrets.internal_secret = Some(secret);
        }
    }
}
