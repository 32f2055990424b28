//! Queue connection state.

use tracing::{info, warn};

/// Observation of the queue connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The backend answered.
    Ready,
    /// The backend failed. `refused` marks a refused connection.
    Error {
        /// Whether the connection was refused.
        refused: bool,
        /// Error text.
        message: String,
    },
}

/// Transition worth an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorSignal {
    /// First refused connection of an outage.
    WentDown(String),
    /// First successful probe after an outage.
    Recovered,
}

/// Owns the up/down state of the queue connection and reports each
/// outage exactly once.
#[derive(Debug, Default)]
pub struct ConnectionSupervisor {
    down: bool,
}

impl ConnectionSupervisor {
    /// A supervisor that assumes the connection is up.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event; returns the transition it caused, if any.
    pub fn observe(&mut self, event: ConnectionEvent) -> Option<SupervisorSignal> {
        match event {
            ConnectionEvent::Ready if self.down => {
                self.down = false;
                info!("Queue connection restored");
                Some(SupervisorSignal::Recovered)
            }
            ConnectionEvent::Ready => None,
            ConnectionEvent::Error {
                refused: true,
                message,
            } if !self.down => {
                self.down = true;
                warn!(error = %message, "Queue connection lost");
                Some(SupervisorSignal::WentDown(message))
            }
            ConnectionEvent::Error { refused, message } => {
                warn!(error = %message, refused, down = self.down, "Queue connection error");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refused() -> ConnectionEvent {
        ConnectionEvent::Error {
            refused: true,
            message: "connect ECONNREFUSED 127.0.0.1:6379".to_string(),
        }
    }

    #[test]
    fn test_one_signal_per_transition() {
        let mut supervisor = ConnectionSupervisor::new();
        assert_eq!(
            supervisor.observe(refused()),
            Some(SupervisorSignal::WentDown(
                "connect ECONNREFUSED 127.0.0.1:6379".to_string()
            ))
        );
        assert_eq!(supervisor.observe(refused()), None);
        assert!(supervisor.down);
        assert_eq!(
            supervisor.observe(ConnectionEvent::Ready),
            Some(SupervisorSignal::Recovered)
        );
        assert_eq!(supervisor.observe(ConnectionEvent::Ready), None);
    }

    #[test]
    fn test_other_errors_do_not_change_state() {
        let mut supervisor = ConnectionSupervisor::new();
        let timeout = ConnectionEvent::Error {
            refused: false,
            message: "timed out".to_string(),
        };
        assert_eq!(supervisor.observe(timeout.clone()), None);
        assert!(!supervisor.down);

        supervisor.observe(refused());
        assert_eq!(supervisor.observe(timeout), None);
        assert!(supervisor.down);
    }

    #[test]
    fn test_second_outage_alerts_again() {
        let mut supervisor = ConnectionSupervisor::new();
        supervisor.observe(refused());
        supervisor.observe(ConnectionEvent::Ready);
        assert!(matches!(
            supervisor.observe(refused()),
            Some(SupervisorSignal::WentDown(_))
        ));
    }
}
