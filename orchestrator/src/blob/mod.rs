//! Blob store adapter
//!
//! Byte blobs under a tenant-prefixed key namespace. Keys are `/` separated
//! relative paths such as `acme/backups/backup_2025-01-15T10-30-00-123Z.json`.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob storage is not configured")]
    NotConfigured,

    #[error("Blob '{0}' not found")]
    NotFound(String),

    #[error("Invalid blob key '{0}'")]
    InvalidKey(String),

    #[error("Blob I/O error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// One listed blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub key: String,
    pub size: u64,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether the store has somewhere to put blobs. Every other operation
    /// fails with [`BlobError::NotConfigured`] when this is false.
    fn is_configured(&self) -> bool;

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Blobs whose key starts with `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, BlobError>;

    async fn delete(&self, key: &str) -> Result<(), BlobError>;
}

/// Reject keys that could escape the namespace: empty or absolute keys,
/// backslashes, and `.`/`..`/empty segments.
pub fn validate_key(key: &str) -> Result<(), BlobError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        Err(BlobError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Prefixes may end with `/`; otherwise the same rules as keys apply.
pub fn validate_prefix(prefix: &str) -> Result<(), BlobError> {
    match prefix.strip_suffix('/') {
        Some("") => Err(BlobError::InvalidKey(prefix.to_string())),
        Some(trimmed) => validate_key(trimmed),
        None => validate_key(prefix),
    }
    .map_err(|_| BlobError::InvalidKey(prefix.to_string()))
}
