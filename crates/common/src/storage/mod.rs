//! Artifact storage abstraction with cloud fallback
//!
//! Persists generated report artifacts (markdown/PDF) under a path derived
//! from a validated customer code, a dimension slug, and a date, to one of
//! three backends selected per customer. Cloud write failures can fall back
//! to local disk when the customer opts in.
//!
//! Path safety: customer codes are allow-list validated before any path is
//! constructed, and dimension slugs come from a closed enum, so no caller
//! input can produce a traversal segment.

mod azure;
mod local;
mod s3;

pub use azure::AzureBlobStore;
pub use local::LocalStore;
pub use s3::S3Store;

use crate::config::StorageConfig;
use crate::db::models::{Customer, StorageBackend};
use crate::dimension::Dimension;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use regex_lite::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Allow-list pattern for customer codes
const CUSTOMER_CODE_PATTERN: &str = r"^[A-Z0-9_-]{1,32}$";

fn customer_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CUSTOMER_CODE_PATTERN).expect("valid pattern"))
}

/// Validate a customer code against the allow-list
pub fn validate_customer_code(code: &str) -> Result<()> {
    if customer_code_regex().is_match(code) {
        Ok(())
    } else {
        Err(AppError::InvalidCustomerCode {
            code: code.to_string(),
        })
    }
}

/// Artifact file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Markdown,
    Pdf,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Markdown => "md",
            ArtifactFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactFormat::Markdown => "text/markdown",
            ArtifactFormat::Pdf => "application/pdf",
        }
    }
}

/// Build the artifact path `{code}/{dimension}_report_{YYYYMMDD}.{ext}`.
/// Rejects invalid customer codes before touching any path machinery.
pub fn artifact_path(
    customer_code: &str,
    dimension: Dimension,
    date: NaiveDate,
    format: ArtifactFormat,
) -> Result<String> {
    validate_customer_code(customer_code)?;
    Ok(format!(
        "{}/{}_report_{}.{}",
        customer_code,
        dimension.slug(),
        date.format("%Y%m%d"),
        format.extension()
    ))
}

/// Uniform store contract over local disk, S3, and Azure Blob
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist content under a validated relative path
    async fn save(&self, relative_path: &str, content: &[u8], content_type: &str) -> Result<()>;

    /// Read content back
    async fn load(&self, relative_path: &str) -> Result<Vec<u8>>;

    /// Whether the backend currently holds the artifact
    async fn exists(&self, relative_path: &str) -> Result<bool>;

    /// Time-limited URL for cloud artifacts; None when the artifact is
    /// served directly (local disk)
    async fn signed_url(&self, relative_path: &str, ttl: Duration) -> Result<Option<String>>;

    /// Backend name for logs and metrics
    fn backend_name(&self) -> &'static str;
}

/// Wraps a cloud store with optional local-disk fallback on write failure
pub struct FallbackStore {
    primary: Arc<dyn ArtifactStore>,
    local: Arc<LocalStore>,
    fallback_enabled: bool,
}

impl FallbackStore {
    pub fn new(
        primary: Arc<dyn ArtifactStore>,
        local: Arc<LocalStore>,
        fallback_enabled: bool,
    ) -> Self {
        Self {
            primary,
            local,
            fallback_enabled,
        }
    }
}

#[async_trait]
impl ArtifactStore for FallbackStore {
    async fn save(&self, relative_path: &str, content: &[u8], content_type: &str) -> Result<()> {
        match self.primary.save(relative_path, content, content_type).await {
            Ok(()) => Ok(()),
            Err(e) if self.fallback_enabled => {
                tracing::warn!(
                    backend = self.primary.backend_name(),
                    path = relative_path,
                    error = %e,
                    "Cloud write failed, falling back to local storage"
                );
                crate::metrics::record_storage_fallback(self.primary.backend_name());
                self.local.save(relative_path, content, content_type).await
            }
            Err(e) => Err(e),
        }
    }

    async fn load(&self, relative_path: &str) -> Result<Vec<u8>> {
        match self.primary.load(relative_path).await {
            Ok(content) => Ok(content),
            Err(_) if self.fallback_enabled => self.local.load(relative_path).await,
            Err(e) => Err(e),
        }
    }

    async fn exists(&self, relative_path: &str) -> Result<bool> {
        match self.primary.exists(relative_path).await {
            Ok(true) => Ok(true),
            Ok(false) | Err(_) if self.fallback_enabled => self.local.exists(relative_path).await,
            other => other,
        }
    }

    /// A fallback-recovered artifact lives only on local disk; signing a
    /// cloud URL for it would hand out a link to an object that was never
    /// uploaded. The primary must hold the object before it gets a URL.
    async fn signed_url(&self, relative_path: &str, ttl: Duration) -> Result<Option<String>> {
        if !self.fallback_enabled {
            return self.primary.signed_url(relative_path, ttl).await;
        }

        match self.primary.exists(relative_path).await {
            Ok(true) => self.primary.signed_url(relative_path, ttl).await,
            Ok(false) => Ok(None),
            Err(e) => {
                tracing::warn!(
                    backend = self.primary.backend_name(),
                    path = relative_path,
                    error = %e,
                    "Cloud existence check failed, serving artifact directly"
                );
                Ok(None)
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        self.primary.backend_name()
    }
}

/// Builds per-customer stores from startup configuration
pub struct StorageFactory {
    local_root: String,
    s3: Option<aws_sdk_s3::Client>,
}

impl StorageFactory {
    /// Initialize the factory. The S3 client is created once; per-customer
    /// buckets are selected per call.
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(ref region) = config.aws_region {
            loader = loader.region(aws_types::region::Region::new(region.clone()));
        }
        let aws_config = loader.load().await;

        Self {
            local_root: config.local_root.clone(),
            s3: Some(aws_sdk_s3::Client::new(&aws_config)),
        }
    }

    /// Factory without AWS initialization, for tests and local-only setups
    pub fn local_only(local_root: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            s3: None,
        }
    }

    /// Store for a customer, honoring its backend and fallback flag
    pub fn for_customer(&self, customer: &Customer) -> Result<Arc<dyn ArtifactStore>> {
        let local = Arc::new(LocalStore::new(&self.local_root));

        let primary: Arc<dyn ArtifactStore> = match customer.backend() {
            StorageBackend::Local => return Ok(local),
            StorageBackend::S3 => {
                let client = self.s3.clone().ok_or_else(|| AppError::Configuration {
                    message: "S3 backend requested but AWS is not configured".to_string(),
                })?;
                let bucket = customer
                    .s3_bucket
                    .clone()
                    .ok_or_else(|| AppError::Configuration {
                        message: format!("Customer {} has no S3 bucket configured", customer.code),
                    })?;
                Arc::new(S3Store::new(client, bucket))
            }
            StorageBackend::AzureBlob => {
                let sas = customer
                    .azure_container_sas
                    .clone()
                    .ok_or_else(|| AppError::Configuration {
                        message: format!(
                            "Customer {} has no Azure container configured",
                            customer.code
                        ),
                    })?;
                Arc::new(AzureBlobStore::new(sas)?)
            }
        };

        Ok(Arc::new(FallbackStore::new(
            primary,
            local,
            customer.storage_fallback_enabled,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_customer_codes() {
        for code in ["ACME", "ACME_CORP", "A1-B2", "X"] {
            assert!(validate_customer_code(code).is_ok(), "{code}");
        }
    }

    #[test]
    fn test_invalid_customer_codes_rejected() {
        for code in ["", "acme", "../etc", "A B", "A/B", "..", "A".repeat(33).as_str()] {
            assert!(validate_customer_code(code).is_err(), "{code}");
        }
    }

    #[test]
    fn test_artifact_path_shape() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let path = artifact_path("ACME", Dimension::DataQuality, date, ArtifactFormat::Pdf)
            .unwrap();
        assert_eq!(path, "ACME/data_quality_report_20260314.pdf");
    }

    #[test]
    fn test_artifact_path_never_contains_traversal() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        for code in ["ACME", "A-1", "Z_9"] {
            for dim in Dimension::ALL {
                for format in [ArtifactFormat::Markdown, ArtifactFormat::Pdf] {
                    let path = artifact_path(code, dim, date, format).unwrap();
                    assert!(!path.contains(".."), "{path}");
                    assert!(!path.starts_with('/'), "{path}");
                }
            }
        }
    }

    #[test]
    fn test_traversal_code_rejected_before_path_construction() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let err = artifact_path("../OTHER", Dimension::DataQuality, date, ArtifactFormat::Markdown)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCustomerCode { .. }));
    }

    struct FailingStore;

    #[async_trait]
    impl ArtifactStore for FailingStore {
        async fn save(&self, _: &str, _: &[u8], _: &str) -> Result<()> {
            Err(AppError::Storage {
                message: "bucket unavailable".into(),
            })
        }

        async fn load(&self, _: &str) -> Result<Vec<u8>> {
            Err(AppError::Storage {
                message: "bucket unavailable".into(),
            })
        }

        async fn exists(&self, _: &str) -> Result<bool> {
            // Nothing ever lands in the failing bucket
            Ok(false)
        }

        async fn signed_url(&self, path: &str, _: Duration) -> Result<Option<String>> {
            Ok(Some(format!("https://bucket.example/{}?sig=abc", path)))
        }

        fn backend_name(&self) -> &'static str {
            "s3"
        }
    }

    #[tokio::test]
    async fn test_fallback_recovers_cloud_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(LocalStore::new(dir.path().to_str().unwrap()));
        let store = FallbackStore::new(Arc::new(FailingStore), local.clone(), true);

        store
            .save("ACME/data_quality_report_20260101.md", b"# Report", "text/markdown")
            .await
            .unwrap();

        let content = local.load("ACME/data_quality_report_20260101.md").await.unwrap();
        assert_eq!(content, b"# Report");
    }

    #[tokio::test]
    async fn test_fallback_recovered_artifact_not_signed_against_cloud() {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(LocalStore::new(dir.path().to_str().unwrap()));
        let store = FallbackStore::new(Arc::new(FailingStore), local, true);

        store
            .save("ACME/data_quality_report_20260101.pdf", b"%PDF", "application/pdf")
            .await
            .unwrap();

        // The primary never received the object, so no URL may point at it;
        // the caller streams the local copy instead
        let url = store
            .signed_url("ACME/data_quality_report_20260101.pdf", Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(url.is_none());

        let content = store
            .load("ACME/data_quality_report_20260101.pdf")
            .await
            .unwrap();
        assert_eq!(content, b"%PDF");
        assert!(store.exists("ACME/data_quality_report_20260101.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_fallback_disabled_surfaces_error() {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(LocalStore::new(dir.path().to_str().unwrap()));
        let store = FallbackStore::new(Arc::new(FailingStore), local, false);

        let err = store
            .save("ACME/data_quality_report_20260101.md", b"# Report", "text/markdown")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage { .. }));
    }
}
