//! Object storage trait for report artifacts.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for object storage backends holding one bucket.
///
/// Implementations exist for the local filesystem and S3-compatible
/// services. Paths are relative to the bucket and use `/` separators.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Short identifier of the backend (`"local"`, `"s3"`).
    fn provider_type(&self) -> &str;

    /// The bucket this provider writes to.
    fn bucket(&self) -> &str;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Upload `data` to `path`, replacing any existing object.
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> AppResult<()>;

    /// Public URL of the object at `path`.
    fn public_url(&self, path: &str) -> String;
}
