//! S3 artifact store

use super::ArtifactStore;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use std::time::Duration;

/// Store backed by one customer's S3 bucket
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ArtifactStore for S3Store {
    async fn save(&self, relative_path: &str, content: &[u8], content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(relative_path)
            .body(ByteStream::from(content.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage {
                message: format!("S3 put failed for {}: {}", relative_path, e),
            })?;

        tracing::debug!(bucket = %self.bucket, key = relative_path, "Artifact written to S3");
        Ok(())
    }

    async fn load(&self, relative_path: &str) -> Result<Vec<u8>> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(relative_path)
            .send()
            .await
            .map_err(|e| AppError::Storage {
                message: format!("S3 get failed for {}: {}", relative_path, e),
            })?;

        let bytes = object.body.collect().await.map_err(|e| AppError::Storage {
            message: format!("S3 body read failed for {}: {}", relative_path, e),
        })?;

        Ok(bytes.into_bytes().to_vec())
    }

    async fn exists(&self, relative_path: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(relative_path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().map(|s| s.is_not_found()).unwrap_or(false) => Ok(false),
            Err(e) => Err(AppError::Storage {
                message: format!("S3 head failed for {}: {}", relative_path, e),
            }),
        }
    }

    async fn signed_url(&self, relative_path: &str, ttl: Duration) -> Result<Option<String>> {
        let presigning = PresigningConfig::expires_in(ttl).map_err(|e| AppError::Storage {
            message: format!("Invalid presign TTL: {}", e),
        })?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(relative_path)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::Storage {
                message: format!("S3 presign failed for {}: {}", relative_path, e),
            })?;

        Ok(Some(request.uri().to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
