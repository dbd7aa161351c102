//! Central repository for timeouts, limits, and naming constants
//!
//! Organized by category so every default lives in one place.

/// Snapshot document and object naming
pub mod snapshot {
    /// Version written by the builder
    pub const CURRENT_VERSION: &str = "2.0-msa";

    /// Legacy single-store version, still restorable
    pub const LEGACY_VERSION: &str = "1.0";

    /// Path segment between tenant and file name
    pub const BACKUPS_SEGMENT: &str = "backups";

    pub const FILE_PREFIX: &str = "backup_";

    pub const FILE_SUFFIX: &str = ".json";

    pub const CONTENT_TYPE: &str = "application/json";
}

/// Default configuration values
pub mod defaults {
    pub const HOST: &str = "0.0.0.0";

    pub const PORT: u16 = 8095;

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 120;

    pub const CONNECT_TIMEOUT_SECONDS: u64 = 10;

    /// Listing cache TTL; 0 disables caching
    pub const LIST_CACHE_TTL_SECONDS: u64 = 30;

    pub const CONFIG_DIR: &str = "config";
}

/// Environment overrides for secrets
pub mod env {
    pub const ADMIN_TOKEN: &str = "ORCHESTRATOR_ADMIN_TOKEN";

    pub const INTERNAL_SECRET: &str = "INTERNAL_SECRET";

    pub const CONFIG_DIR: &str = "ORCHESTRATOR_CONFIG_DIR";
}

/// Operation names used by the per-tenant guard
pub mod operations {
    pub const CREATE: &str = "backup_creation";

    pub const RESTORE: &str = "backup_restore";
}
