pub mod blob;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod http;
pub mod operation_tracker;
pub mod services;
pub mod snapshot;
pub mod web;

// Re-export commonly used types
pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use config::{Config, ConfigManager, Topology};
pub use errors::OrchestratorError;
pub use operation_tracker::TenantOperationTracker;
pub use services::{BackupService, RestoreTarget};
pub use web::AppState;
