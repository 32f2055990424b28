//! Failure alerts for administrators.

pub mod notifier;
pub mod panic;
pub mod supervisor;
pub mod transport;

pub use notifier::FailureNotifier;
pub use panic::{alert_blocking, install_panic_hook, panic_message};
pub use supervisor::{ConnectionEvent, ConnectionSupervisor, SupervisorSignal};
pub use transport::{HttpEmailTransport, LogEmailTransport, transport_from_config};
