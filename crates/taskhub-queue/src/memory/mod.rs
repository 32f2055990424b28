//! In-process queue backend.

pub mod queue;

pub use queue::MemoryJobQueue;
