use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::{validate_key, validate_prefix, BlobEntry, BlobError, BlobStore};

/// Blob store rooted at a local directory. A `None` root means blob storage
/// has not been configured for this deployment.
pub struct FsBlobStore {
    root: Option<PathBuf>,
}

impl FsBlobStore {
    pub fn new(root: Option<PathBuf>) -> Self {
        match &root {
            Some(path) => info!("Blob store rooted at {}", path.display()),
            None => info!("Blob store not configured"),
        }
        Self { root }
    }

    fn root(&self) -> Result<&Path, BlobError> {
        self.root.as_deref().ok_or(BlobError::NotConfigured)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        validate_key(key)?;
        Ok(self.root()?.join(key))
    }
}

fn io_error(key: &str, source: std::io::Error) -> BlobError {
    if source.kind() == ErrorKind::NotFound {
        BlobError::NotFound(key.to_string())
    } else {
        BlobError::Io {
            key: key.to_string(),
            source,
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn is_configured(&self) -> bool {
        self.root.is_some()
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(key, e))?;
        }

        // Write next to the target and rename so readers never see half a blob.
        let staging = path.with_extension("partial");
        fs::write(&staging, &bytes)
            .await
            .map_err(|e| io_error(key, e))?;
        fs::rename(&staging, &path)
            .await
            .map_err(|e| io_error(key, e))?;

        debug!("Stored {} ({} bytes, {})", key, bytes.len(), content_type);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.path_for(key)?;
        fs::read(&path).await.map_err(|e| io_error(key, e))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, BlobError> {
        validate_prefix(prefix)?;
        let root = self.root()?;

        // Walk only the directory the prefix names, then filter by full key.
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let dir = root.join(dir_part);

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(prefix, e)),
        };

        let mut blobs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(prefix, e))?
        {
            let metadata = entry.metadata().await.map_err(|e| io_error(prefix, e))?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.ends_with(".partial") {
                continue;
            }

            let key = if dir_part.is_empty() {
                name
            } else {
                format!("{}/{}", dir_part, name)
            };
            if key.starts_with(prefix) {
                blobs.push(BlobEntry {
                    key,
                    size: metadata.len(),
                });
            }
        }

        Ok(blobs)
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        let path = self.path_for(key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| io_error(key, e))?;
        debug!("Deleted {}", key);
        Ok(())
    }
}
