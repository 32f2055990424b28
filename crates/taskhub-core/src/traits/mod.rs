//! Core traits defined in `taskhub-core` and implemented by other crates.

pub mod mailer;
pub mod queue;
pub mod storage;

pub use mailer::{EmailMessage, EmailTransport};
pub use queue::{
    Delivery, EnqueueOutcome, FailureDisposition, JobQueue, NewJob, QueueError, QueueStats,
    StalledJobs, stalled_error,
};
pub use storage::StorageProvider;
