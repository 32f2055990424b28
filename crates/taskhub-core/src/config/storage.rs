//! Object storage configuration.

use serde::{Deserialize, Serialize};

/// Object storage configuration for report artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Provider: `"local"` or `"s3"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Bucket holding report artifacts.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Base URL public links are built from. Empty means provider default.
    #[serde(default)]
    pub public_base_url: String,
    /// Local filesystem provider settings.
    #[serde(default)]
    pub local: LocalStorageConfig,
    /// S3-compatible provider settings.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            bucket: default_bucket(),
            public_base_url: String::new(),
            local: LocalStorageConfig::default(),
            s3: S3StorageConfig::default(),
        }
    }
}

/// Local filesystem storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Root directory; buckets are subdirectories.
    #[serde(default = "default_root")]
    pub root: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

/// S3-compatible storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3StorageConfig {
    /// AWS region.
    #[serde(default)]
    pub region: String,
    /// Custom endpoint (MinIO, Supabase storage, R2).
    #[serde(default)]
    pub endpoint: String,
    /// Static access key. Empty uses the default credential chain.
    #[serde(default)]
    pub access_key: String,
    /// Static secret key.
    #[serde(default)]
    pub secret_key: String,
    /// Use path-style addressing.
    #[serde(default)]
    pub force_path_style: bool,
}

fn default_provider() -> String {
    "local".to_string()
}

fn default_bucket() -> String {
    "reports".to_string()
}

fn default_root() -> String {
    "./data/storage".to_string()
}
