//! Local filesystem storage provider.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use taskhub_core::error::{AppError, ErrorKind};
use taskhub_core::result::AppResult;
use taskhub_core::traits::storage::StorageProvider;

use crate::paths::join_url;

/// Stores objects under `{root}/{bucket}/{path}`.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    bucket_root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl LocalStorageProvider {
    /// Create the provider, creating the bucket directory if needed.
    ///
    /// An empty `public_base_url` yields `file://` URLs.
    pub async fn new(root: &str, bucket: &str, public_base_url: &str) -> AppResult<Self> {
        let bucket_root = PathBuf::from(root).join(bucket);
        fs::create_dir_all(&bucket_root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", bucket_root.display()),
                e,
            )
        })?;

        let public_base_url = if public_base_url.is_empty() {
            let absolute = fs::canonicalize(root).await.unwrap_or_else(|_| PathBuf::from(root));
            format!("file://{}", absolute.display())
        } else {
            public_base_url.to_string()
        };

        Ok(Self {
            bucket_root,
            bucket: bucket.to_string(),
            public_base_url,
        })
    }

    /// Resolve an object path, rejecting traversal outside the bucket.
    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let clean = path.trim_start_matches('/');
        if clean.is_empty() || clean.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(AppError::validation(format!("Invalid object path: '{path}'")));
        }
        Ok(self.bucket_root.join(clean))
    }

    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.bucket_root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;

        // Write next to the target and rename so readers never see a partial file.
        let staging = full_path.with_extension(format!("{}.part", uuid::Uuid::new_v4().simple()));
        fs::write(&staging, &data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write object: {path}"), e)
        })?;
        fs::rename(&staging, &full_path).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to store object: {path}"), e)
        })?;

        debug!(path, bytes = data.len(), content_type, "Uploaded object");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_base_url, &self.bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn provider(dir: &tempfile::TempDir, base: &str) -> LocalStorageProvider {
        LocalStorageProvider::new(dir.path().to_str().expect("utf-8 path"), "reports", base)
            .await
            .expect("provider")
    }

    #[tokio::test]
    async fn test_upload_creates_nested_object_without_staging_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = provider(&dir, "http://files.local").await;

        provider
            .upload("t1/r1/u1.pdf", Bytes::from_static(b"%PDF-1.7"), "application/pdf")
            .await
            .expect("upload");
        let stored = std::fs::read(dir.path().join("reports/t1/r1/u1.pdf")).expect("read back");
        assert_eq!(stored, b"%PDF-1.7");

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("reports/t1/r1"))
            .expect("list")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("u1.pdf")]);
        assert!(provider.health_check().await.expect("health"));
    }

    #[tokio::test]
    async fn test_upload_replaces_existing_object() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = provider(&dir, "http://files.local").await;

        provider
            .upload("a.xlsx", Bytes::from_static(b"one"), "x")
            .await
            .expect("first");
        provider
            .upload("a.xlsx", Bytes::from_static(b"two"), "x")
            .await
            .expect("second");
        let stored = std::fs::read(dir.path().join("reports/a.xlsx")).expect("read back");
        assert_eq!(stored, b"two");
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = provider(&dir, "").await;
        let err = provider
            .upload("../escape.pdf", Bytes::new(), "application/pdf")
            .await
            .expect_err("traversal");
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_public_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = provider(&dir, "https://cdn.example.com/storage/").await;
        assert_eq!(
            provider.public_url("t/r/u.pdf"),
            "https://cdn.example.com/storage/reports/t/r/u.pdf"
        );

        let file_backed = super::LocalStorageProvider::new(
            dir.path().to_str().expect("utf-8 path"),
            "reports",
            "",
        )
        .await
        .expect("provider");
        assert!(file_backed.public_url("x.pdf").starts_with("file://"));
    }
}
