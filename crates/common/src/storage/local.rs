//! Local filesystem artifact store

use super::ArtifactStore;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Store rooted at a configured directory
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a relative path under the root. Callers validate the inputs
    /// the path was built from; this is a second line of defense.
    fn resolve(&self, relative_path: &str) -> Result<PathBuf> {
        let relative = Path::new(relative_path);
        let traversal = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if traversal {
            return Err(AppError::Storage {
                message: format!("Refusing non-normal path: {}", relative_path),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn save(&self, relative_path: &str, content: &[u8], _content_type: &str) -> Result<()> {
        let path = self.resolve(relative_path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "Artifact written locally");
        Ok(())
    }

    async fn load(&self, relative_path: &str) -> Result<Vec<u8>> {
        let path = self.resolve(relative_path)?;
        tokio::fs::read(&path).await.map_err(|e| AppError::Storage {
            message: format!("Failed to read {}: {}", relative_path, e),
        })
    }

    async fn exists(&self, relative_path: &str) -> Result<bool> {
        let path = self.resolve(relative_path)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn signed_url(&self, _relative_path: &str, _ttl: Duration) -> Result<Option<String>> {
        // Local artifacts are streamed through the API instead
        Ok(None)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store
            .save("ACME/data_quality_report_20260101.md", b"# Data Quality", "text/markdown")
            .await
            .unwrap();

        let content = store.load("ACME/data_quality_report_20260101.md").await.unwrap();
        assert_eq!(content, b"# Data Quality");
    }

    #[tokio::test]
    async fn test_same_day_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.save("ACME/r.md", b"first", "text/markdown").await.unwrap();
        store.save("ACME/r.md", b"second", "text/markdown").await.unwrap();

        assert_eq!(store.load("ACME/r.md").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let err = store.save("../escape.md", b"x", "text/markdown").await.unwrap_err();
        assert!(matches!(err, AppError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_no_signed_url_for_local() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let url = store
            .signed_url("ACME/r.md", Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(url.is_none());
    }
}
