//! # taskhub-storage
//!
//! Object storage provider implementations for report artifacts. Supports
//! the local filesystem and S3-compatible object stores.

pub mod manager;
pub mod paths;
pub mod providers;

pub use manager::StorageManager;
