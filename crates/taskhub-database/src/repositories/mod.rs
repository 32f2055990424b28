//! Concrete repository implementations over PostgreSQL.

pub mod activity;
pub mod report;
pub mod snapshot;
pub mod user;

pub use activity::ActivityRepository;
pub use report::ReportRepository;
pub use snapshot::SnapshotRepository;
pub use user::UserRepository;
