// File: orchestrator/src/services/mod.rs

pub mod backup_service;
pub mod builder;
pub mod catalog;
pub mod restore;

pub use backup_service::BackupService;
pub use builder::{CreatedSnapshot, SnapshotBuilder};
pub use catalog::{BackupListing, ListingCache, SnapshotCatalog};
pub use restore::{FailedService, RestoreOrchestrator, RestoreReport, RestoreTarget};
