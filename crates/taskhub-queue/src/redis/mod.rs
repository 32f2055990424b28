//! Redis queue backend.

pub mod client;
pub mod queue;
mod scripts;

pub use client::RedisClient;
pub use queue::RedisJobQueue;
