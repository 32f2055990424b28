//! Core type definitions used across the TaskHub workspace.

pub mod date_range;
pub mod id;
pub mod pagination;

pub use date_range::DateRange;
pub use id::*;
pub use pagination::{PageRequest, PageResponse};
