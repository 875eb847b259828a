//! Azure Blob artifact store
//!
//! Customers provision a container SAS URL; uploads are plain HTTPS PUTs
//! against it and the SAS grant itself is the time-limited read access.

use super::ArtifactStore;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Store backed by one customer's blob container
pub struct AzureBlobStore {
    http: reqwest::Client,
    base_url: String,
    sas_query: String,
}

impl AzureBlobStore {
    /// Split a container SAS URL (`https://acct.blob.core.windows.net/container?sv=...`)
    /// into the container base and the SAS token query.
    pub fn new(container_sas: String) -> Result<Self> {
        let (base_url, sas_query) =
            container_sas
                .split_once('?')
                .ok_or_else(|| AppError::Configuration {
                    message: "Azure container SAS URL is missing its token".to_string(),
                })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            sas_query: sas_query.to_string(),
        })
    }

    fn blob_url(&self, relative_path: &str) -> String {
        format!("{}/{}?{}", self.base_url, relative_path, self.sas_query)
    }
}

#[async_trait]
impl ArtifactStore for AzureBlobStore {
    async fn save(&self, relative_path: &str, content: &[u8], content_type: &str) -> Result<()> {
        let response = self
            .http
            .put(self.blob_url(relative_path))
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Type", content_type)
            .body(content.to_vec())
            .send()
            .await
            .map_err(|e| AppError::Storage {
                message: format!("Blob put failed for {}: {}", relative_path, e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Storage {
                message: format!(
                    "Blob put rejected for {}: {}",
                    relative_path,
                    response.status()
                ),
            });
        }

        tracing::debug!(path = relative_path, "Artifact written to blob storage");
        Ok(())
    }

    async fn load(&self, relative_path: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(self.blob_url(relative_path))
            .send()
            .await
            .map_err(|e| AppError::Storage {
                message: format!("Blob get failed for {}: {}", relative_path, e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Storage {
                message: format!(
                    "Blob get rejected for {}: {}",
                    relative_path,
                    response.status()
                ),
            });
        }

        Ok(response
            .bytes()
            .await
            .map_err(|e| AppError::Storage {
                message: format!("Blob body read failed for {}: {}", relative_path, e),
            })?
            .to_vec())
    }

    async fn exists(&self, relative_path: &str) -> Result<bool> {
        let response = self
            .http
            .head(self.blob_url(relative_path))
            .send()
            .await
            .map_err(|e| AppError::Storage {
                message: format!("Blob head failed for {}: {}", relative_path, e),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(AppError::Storage {
                message: format!(
                    "Blob head rejected for {}: {}",
                    relative_path,
                    response.status()
                ),
            });
        }
        Ok(true)
    }

    async fn signed_url(&self, relative_path: &str, _ttl: Duration) -> Result<Option<String>> {
        // The SAS grant carries its own expiry
        Ok(Some(self.blob_url(relative_path)))
    }

    fn backend_name(&self) -> &'static str {
        "azure_blob"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sas_url_split() {
        let store = AzureBlobStore::new(
            "https://acct.blob.core.windows.net/reports?sv=2024&sig=abc".to_string(),
        )
        .unwrap();
        assert_eq!(
            store.blob_url("ACME/data_quality_report_20260101.pdf"),
            "https://acct.blob.core.windows.net/reports/ACME/data_quality_report_20260101.pdf?sv=2024&sig=abc"
        );
    }

    #[test]
    fn test_sas_without_token_rejected() {
        let err =
            AzureBlobStore::new("https://acct.blob.core.windows.net/reports".to_string())
                .map(|_| ())
                .unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_blob_put_against_mock_server() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/reports/ACME/r.md"))
            .and(header("x-ms-blob-type", "BlockBlob"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let store =
            AzureBlobStore::new(format!("{}/reports?sv=2024&sig=abc", server.uri())).unwrap();
        store.save("ACME/r.md", b"# Report", "text/markdown").await.unwrap();
    }
}
