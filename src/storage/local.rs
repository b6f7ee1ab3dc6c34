use crate::error::StorageError;
use crate::storage::{validate_file_name, StorageService};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Files under `<web_root>/<folder>`, served by the static file handler at `/<folder>/<name>`.
pub struct LocalFileStorage {
    root: PathBuf,
    folder: String,
}

impl LocalFileStorage {
    pub fn new(web_root: &Path, folder: &str) -> Self {
        let folder = folder.trim_matches('/').to_string();
        LocalFileStorage {
            root: web_root.join(&folder),
            folder,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn path_of(&self, file_name: &str) -> Result<PathBuf, StorageError> {
        validate_file_name(file_name)?;
        Ok(self.root.join(file_name))
    }
}

#[async_trait]
impl StorageService for LocalFileStorage {
    fn file_url(&self, file_name: &str) -> String {
        format!("/{}/{}", self.folder, file_name)
    }

    async fn save_file(&self, bytes: &[u8], file_name: &str) -> Result<(), StorageError> {
        let path = self.path_of(file_name)?;
        self.ensure_root().await?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "file saved");
        Ok(())
    }

    async fn load_file(&self, file_name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_of(file_name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(file_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, file_name: &str) -> Result<(), StorageError> {
        let path = self.path_of(file_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_web_root() -> PathBuf {
        std::env::temp_dir().join(format!("course-catalog-test-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn save_load_delete() {
        let web_root = temp_web_root();
        let storage = LocalFileStorage::new(&web_root, "user-content");

        storage.save_file(b"png bytes", "lesson.png").await.unwrap();
        assert!(web_root.join("user-content").join("lesson.png").exists());
        assert_eq!(storage.load_file("lesson.png").await.unwrap(), b"png bytes");
        assert_eq!(storage.file_url("lesson.png"), "/user-content/lesson.png");
        assert_eq!(
            storage.file_name_from_url("/user-content/lesson.png").as_deref(),
            Some("lesson.png")
        );
        assert_eq!(storage.file_name_from_url("https://elsewhere/lesson.png"), None);

        storage.delete_file("lesson.png").await.unwrap();
        storage.delete_file("lesson.png").await.unwrap();
        assert!(matches!(
            storage.load_file("lesson.png").await,
            Err(StorageError::NotFound(_))
        ));

        tokio::fs::remove_dir_all(&web_root).await.unwrap();
    }

    #[tokio::test]
    async fn refuses_traversal() {
        let storage = LocalFileStorage::new(&temp_web_root(), "user-content");
        assert!(matches!(
            storage.save_file(b"x", "../escape.txt").await,
            Err(StorageError::InvalidName(_))
        ));
    }
}
