//! Connection-lifecycle state machine.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ConnectionError;

/// The state of a service's attachment to the broker.
///
/// State transitions:
/// ```text
///                AttachStarted            AttachSucceeded
/// Disconnected ───────────────► Connecting ───────────────► Connected
///      ▲                            │                           │
///      └──────── AttachFailed ──────┘                           │
///      └──────────────────────── SessionLost ───────────────────┘
///
/// Shutdown moves any state to Disconnected.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No usable broker session (initial state).
    #[default]
    Disconnected,

    /// An attach attempt is in progress.
    Connecting,

    /// Every broker handle the service needs is attached.
    Connected,
}

/// Events that drive [`ConnectionState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEvent {
    AttachStarted,
    AttachSucceeded,
    AttachFailed,
    SessionLost,
    Shutdown,
}

impl ConnectionState {
    /// Returns the state reached by applying `event`, or an error if the
    /// event is not valid in this state.
    pub fn on(self, event: ConnectionEvent) -> Result<ConnectionState, ConnectionError> {
        use ConnectionEvent as E;
        use ConnectionState as S;

        match (self, event) {
            (_, E::Shutdown) => Ok(S::Disconnected),
            (S::Disconnected, E::AttachStarted) => Ok(S::Connecting),
            (S::Connecting, E::AttachSucceeded) => Ok(S::Connected),
            (S::Connecting, E::AttachFailed) => Ok(S::Disconnected),
            (S::Connected, E::SessionLost) => Ok(S::Disconnected),
            (from, event) => Err(ConnectionError::InvalidTransition { from, event }),
        }
    }

    /// Returns true if the service can use its broker handles.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }

    fn gauge_value(&self) -> f64 {
        match self {
            ConnectionState::Disconnected => 0.0,
            ConnectionState::Connecting => 1.0,
            ConnectionState::Connected => 2.0,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of a service's [`ConnectionState`].
///
/// Cloning yields another handle to the same state. The state only changes
/// through [`apply`](Self::apply); everything else reads it.
#[derive(Clone)]
pub struct ConnectionMonitor {
    service: Arc<str>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl ConnectionMonitor {
    /// Creates a monitor in the `Disconnected` state.
    pub fn new(service: impl Into<String>) -> Self {
        let service: Arc<str> = Arc::from(service.into());
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        metrics::gauge!("broker_connection_state", "service" => service.to_string())
            .set(ConnectionState::Disconnected.gauge_value());
        Self {
            service,
            state: Arc::new(state),
        }
    }

    /// Name of the service this monitor belongs to.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns true if the current state is `Connected`.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Applies a lifecycle event. On an invalid transition the state is left
    /// unchanged and the error is returned.
    pub fn apply(&self, event: ConnectionEvent) -> Result<ConnectionState, ConnectionError> {
        let mut outcome = Ok(ConnectionState::Disconnected);
        let mut previous = ConnectionState::Disconnected;
        self.state.send_if_modified(|state| {
            previous = *state;
            match state.on(event) {
                Ok(next) => {
                    *state = next;
                    outcome = Ok(next);
                    previous != next
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });

        if let Ok(next) = &outcome {
            if previous != *next {
                tracing::debug!(
                    service = %self.service,
                    from = %previous,
                    to = %next,
                    ?event,
                    "connection state changed"
                );
                metrics::gauge!("broker_connection_state", "service" => self.service.to_string())
                    .set(next.gauge_value());
            }
        }
        outcome
    }

    /// Waits until the state equals `target`.
    pub async fn wait_for(&self, target: ConnectionState) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|state| *state == target).await;
    }

    /// Waits until the state is `Connected`.
    pub async fn wait_for_connected(&self) {
        self.wait_for(ConnectionState::Connected).await;
    }
}

impl std::fmt::Debug for ConnectionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionMonitor")
            .field("service", &self.service)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ConnectionEvent as E;
    use ConnectionState as S;

    #[test]
    fn test_attach_success_path() {
        let s = S::Disconnected.on(E::AttachStarted).unwrap();
        assert_eq!(s, S::Connecting);
        let s = s.on(E::AttachSucceeded).unwrap();
        assert_eq!(s, S::Connected);
        assert!(s.is_connected());
    }

    #[test]
    fn test_attach_failure_returns_to_disconnected() {
        let s = S::Connecting.on(E::AttachFailed).unwrap();
        assert_eq!(s, S::Disconnected);
    }

    #[test]
    fn test_session_loss_and_shutdown() {
        assert_eq!(S::Connected.on(E::SessionLost).unwrap(), S::Disconnected);
        for state in [S::Disconnected, S::Connecting, S::Connected] {
            assert_eq!(state.on(E::Shutdown).unwrap(), S::Disconnected);
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(S::Disconnected.on(E::AttachSucceeded).is_err());
        assert!(S::Disconnected.on(E::SessionLost).is_err());
        assert!(S::Connected.on(E::AttachStarted).is_err());
        assert!(S::Connecting.on(E::AttachStarted).is_err());
        assert!(S::Connected.on(E::AttachFailed).is_err());
    }

    #[test]
    fn test_monitor_starts_disconnected() {
        let monitor = ConnectionMonitor::new("test-service");
        assert_eq!(monitor.state(), S::Disconnected);
        assert!(!monitor.is_connected());
        assert_eq!(monitor.service(), "test-service");
    }

    #[test]
    fn test_monitor_rejects_invalid_event_without_changing_state() {
        let monitor = ConnectionMonitor::new("svc");
        monitor.apply(E::AttachStarted).unwrap();

        let err = monitor.apply(E::SessionLost).unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::InvalidTransition {
                from: S::Connecting,
                event: E::SessionLost
            }
        ));
        assert_eq!(monitor.state(), S::Connecting);
    }

    #[test]
    fn test_monitor_clones_share_state() {
        let monitor = ConnectionMonitor::new("svc");
        let reader = monitor.clone();

        monitor.apply(E::AttachStarted).unwrap();
        monitor.apply(E::AttachSucceeded).unwrap();
        assert!(reader.is_connected());
    }

    #[tokio::test]
    async fn test_wait_for_connected() {
        let monitor = ConnectionMonitor::new("svc");
        let waiter = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.wait_for_connected().await })
        };

        monitor.apply(E::AttachStarted).unwrap();
        monitor.apply(E::AttachSucceeded).unwrap();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter not released")
            .unwrap();
    }
}
