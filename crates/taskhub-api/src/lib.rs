//! # taskhub-api
//!
//! HTTP API layer for TaskHub built on Axum.
//!
//! Provides the report endpoints, health checks, the bearer token
//! extractor, request logging, CORS, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
