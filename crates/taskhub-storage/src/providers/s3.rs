//! S3-compatible object storage provider.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info, warn};

use taskhub_core::config::{S3StorageConfig, StorageConfig};
use taskhub_core::error::AppError;
use taskhub_core::result::AppResult;
use taskhub_core::traits::storage::StorageProvider;

use crate::paths::join_url;

/// S3-compatible storage provider (AWS, MinIO, Supabase storage, R2).
#[derive(Debug, Clone)]
pub struct S3StorageProvider {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3StorageProvider {
    /// Build a client from the storage configuration.
    pub async fn new(config: &StorageConfig) -> AppResult<Self> {
        let s3 = &config.s3;
        info!(
            endpoint = %s3.endpoint,
            region = %s3.region,
            bucket = %config.bucket,
            "Initializing S3 storage provider"
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if !s3.region.is_empty() {
            loader = loader.region(Region::new(s3.region.clone()));
        }
        if !s3.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                s3.access_key.clone(),
                s3.secret_key.clone(),
                None,
                None,
                "taskhub-config",
            ));
        }
        let shared = loader.load().await;

        let mut builder = Builder::from(&shared).force_path_style(s3.force_path_style);
        if !s3.endpoint.is_empty() {
            builder = builder.endpoint_url(s3.endpoint.clone());
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            public_base_url: public_base_url(config, s3),
        })
    }
}

/// Base URL of public object links, without the bucket.
fn public_base_url(config: &StorageConfig, s3: &S3StorageConfig) -> String {
    if !config.public_base_url.is_empty() {
        config.public_base_url.clone()
    } else if !s3.endpoint.is_empty() {
        s3.endpoint.clone()
    } else {
        let region = if s3.region.is_empty() { "us-east-1" } else { &s3.region };
        format!("https://s3.{region}.amazonaws.com")
    }
}

#[async_trait]
impl StorageProvider for S3StorageProvider {
    fn provider_type(&self) -> &str {
        "s3"
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn health_check(&self) -> AppResult<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(bucket = %self.bucket, error = %DisplayErrorContext(&e), "S3 health check failed");
                Ok(false)
            }
        }
    }

    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!(
                    "Failed to upload {path} to bucket {}: {}",
                    self.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!(path, bytes = size, content_type, "Uploaded object to S3");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_base_url, &self.bucket, path)
    }
}
