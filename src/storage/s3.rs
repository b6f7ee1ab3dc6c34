use crate::error::StorageError;
use crate::storage::{validate_file_name, StorageService};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;

/// Objects under `<prefix>/<name>` in one bucket. Credentials and region come from the AWS environment.
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    pub async fn from_env(bucket: String, prefix: String) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket, prefix)
    }

    pub fn new(client: aws_sdk_s3::Client, bucket: String, prefix: String) -> Self {
        S3Storage {
            client,
            bucket,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    fn key_of(&self, file_name: &str) -> Result<String, StorageError> {
        validate_file_name(file_name)?;
        Ok(format!("{}/{}", self.prefix, file_name))
    }
}

#[async_trait]
impl StorageService for S3Storage {
    fn file_url(&self, file_name: &str) -> String {
        format!("https://{}.s3.amazonaws.com/{}/{}", self.bucket, self.prefix, file_name)
    }

    async fn save_file(&self, bytes: &[u8], file_name: &str) -> Result<(), StorageError> {
        let key = self.key_of(file_name)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::Remote(e.to_string()))?;
        tracing::debug!(bucket = %self.bucket, key = %key, size = bytes.len(), "object stored");
        Ok(())
    }

    async fn load_file(&self, file_name: &str) -> Result<Vec<u8>, StorageError> {
        let key = self.key_of(file_name)?;
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|s| s.is_no_such_key()).unwrap_or(false) {
                    StorageError::NotFound(file_name.to_string())
                } else {
                    StorageError::Remote(e.to_string())
                }
            })?;
        let data = object
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Remote(e.to_string()))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn delete_file(&self, file_name: &str) -> Result<(), StorageError> {
        let key = self.key_of(file_name)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| StorageError::Remote(e.to_string()))?;
        Ok(())
    }
}
