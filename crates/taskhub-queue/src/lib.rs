//! # taskhub-queue
//!
//! Job queue backends for TaskHub. Supports two modes:
//!
//! - **redis**: a reliable queue on Redis lists with per-job lease keys
//! - **memory**: an in-process queue with the same lease semantics
//!
//! The backend is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::QueueManager;
