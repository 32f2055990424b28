//! Task and work log entities read by the report aggregator.

pub mod model;
pub mod status;

pub use model::{Task, TaskWorkLog};
pub use status::TaskStatus;
