//! # taskhub-entity
//!
//! Domain entity models for TaskHub report generation. Every struct in this
//! crate represents a database table row or a domain value object. Database
//! entities derive `sqlx::FromRow`.

pub mod job;
pub mod report;
pub mod snapshot;
pub mod task;
pub mod user;
