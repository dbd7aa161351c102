//! Error types for the backup orchestrator
//!
//! Every failure an administrative request can end in is one of the
//! [`OrchestratorError`] variants. Each variant names the stage it came from,
//! which is reported back to the operator next to the message.
//!
//! Per-record and per-service failures during a restore are not errors: they
//! are counted in the restore report.

use domain_agent::store::StoreError;
use thiserror::Error;

pub use crate::blob::BlobError;

/// Main error type for the orchestrator
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("Snapshot validation failed: {0}")]
    Snapshot(#[from] SnapshotError),

    /// At least one domain service failed to export; nothing was written.
    #[error("Export failed for {} service(s): {}", .failures.len(), summarize(.failures))]
    ExportAggregation { failures: Vec<ServiceFailure> },

    /// The single-store restore transaction failed and was rolled back.
    #[error("Restore transaction failed: {0}")]
    Store(#[from] StoreError),

    #[error("Tenant {tenant} is currently busy with '{operation}' (started {elapsed} ago)")]
    Busy {
        tenant: String,
        operation: String,
        elapsed: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Stage label reported alongside the message.
    pub fn stage(&self) -> &'static str {
        match self {
            OrchestratorError::Config(_) => "configuration",
            OrchestratorError::Blob(BlobError::NotConfigured) => "configuration",
            OrchestratorError::Blob(_) => "blob_io",
            OrchestratorError::Snapshot(_) => "validation",
            OrchestratorError::ExportAggregation { .. } => "export_aggregation",
            OrchestratorError::Store(_) => "restore",
            OrchestratorError::Busy { .. } => "operation_guard",
            OrchestratorError::Internal(_) => "internal",
        }
    }
}

/// Configuration error variants
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },
}

/// Snapshot document and file name validation failures
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {0}")]
    Malformed(String),

    #[error("Unsupported snapshot version '{0}'")]
    UnsupportedVersion(String),

    #[error("Snapshot belongs to tenant '{found}', not '{expected}'")]
    TenantMismatch { expected: String, found: String },

    #[error("Invalid backup file name '{0}'")]
    InvalidFileName(String),

    #[error("Invalid tenant id '{0}'")]
    InvalidTenant(String),
}

/// Failure of one call to a domain service
#[derive(Debug, Clone, Error)]
pub enum ServiceCallError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("service reported failure: {0}")]
    Rejected(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ServiceCallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceCallError::Timeout
        } else if err.is_decode() {
            ServiceCallError::InvalidResponse(err.to_string())
        } else {
            ServiceCallError::Connection(err.to_string())
        }
    }
}

/// A named service and what went wrong with it
#[derive(Debug, Clone)]
pub struct ServiceFailure {
    pub service: String,
    pub error: ServiceCallError,
}

fn summarize(failures: &[ServiceFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.service, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = OrchestratorError> = std::result::Result<T, E>;
