//! Storage manager that dispatches to the configured provider.

use std::sync::Arc;

use tracing::info;

use taskhub_core::config::StorageConfig;
use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_core::traits::storage::StorageProvider;

/// Holds the provider for the report bucket.
#[derive(Debug, Clone)]
pub struct StorageManager {
    provider: Arc<dyn StorageProvider>,
}

impl StorageManager {
    /// Create the provider named by `config.provider`.
    pub async fn new(config: &StorageConfig) -> AppResult<Self> {
        let provider: Arc<dyn StorageProvider> = match config.provider.as_str() {
            "local" => {
                info!(root = %config.local.root, bucket = %config.bucket, "Initializing local storage provider");
                Arc::new(
                    crate::providers::LocalStorageProvider::new(
                        &config.local.root,
                        &config.bucket,
                        &config.public_base_url,
                    )
                    .await?,
                )
            }
            #[cfg(feature = "s3")]
            "s3" => Arc::new(crate::providers::S3StorageProvider::new(config).await?),
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown storage provider: '{other}'. Supported: local, s3"
                )));
            }
        };
        Ok(Self { provider })
    }

    /// Wrap an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// Shared handle to the provider.
    pub fn provider(&self) -> Arc<dyn StorageProvider> {
        Arc::clone(&self.provider)
    }
}
