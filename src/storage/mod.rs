//! File storage for lesson images. Local disk under the web root, or an S3 bucket.

mod local;
mod s3;

pub use local::LocalFileStorage;
pub use s3::S3Storage;

use crate::config::{StorageBackend, StorageSettings};
use crate::error::StorageError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Public URL (or path) under which a stored file is served.
    fn file_url(&self, file_name: &str) -> String;

    async fn save_file(&self, bytes: &[u8], file_name: &str) -> Result<(), StorageError>;

    async fn load_file(&self, file_name: &str) -> Result<Vec<u8>, StorageError>;

    /// Deleting a file that does not exist is not an error.
    async fn delete_file(&self, file_name: &str) -> Result<(), StorageError>;

    /// Inverse of [`StorageService::file_url`]; `None` when the URL is not one of ours.
    fn file_name_from_url(&self, url: &str) -> Option<String> {
        let base = self.file_url("");
        url.strip_prefix(&base)
            .filter(|name| validate_file_name(name).is_ok())
            .map(str::to_string)
    }
}

/// Plain file names only: no separators, no parent references.
pub fn validate_file_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name == "." || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Stored name for an upload: a fresh id keeping the original extension.
pub fn unique_file_name(original: Option<&str>) -> String {
    let ext = original
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}{}", uuid::Uuid::new_v4(), ext)
}

pub async fn build_storage(
    settings: &StorageSettings,
    web_root: &Path,
) -> Result<Arc<dyn StorageService>, StorageError> {
    let storage: Arc<dyn StorageService> = match &settings.backend {
        StorageBackend::Local => {
            let storage = LocalFileStorage::new(web_root, &settings.user_content_folder);
            storage.ensure_root().await?;
            tracing::info!(root = %storage.root().display(), "using local file storage");
            Arc::new(storage)
        }
        StorageBackend::S3 { bucket } => {
            tracing::info!(bucket = %bucket, "using S3 file storage");
            Arc::new(S3Storage::from_env(bucket.clone(), settings.user_content_folder.clone()).await)
        }
    };
    Ok(storage)
}
