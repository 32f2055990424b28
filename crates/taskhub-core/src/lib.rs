//! # taskhub-core
//!
//! Core crate for TaskHub report generation. Contains the seams implemented
//! by other crates (object storage, job queue, email transport),
//! configuration schemas, typed identifiers, date ranges, pagination types,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other TaskHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
