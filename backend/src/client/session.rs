//! Client session state.
//!
//! A `SessionHandle` is created once by the application and cloned into the
//! API adapter and the optimistic controller. It holds the current
//! `SessionState` and publishes `SessionEvent`s on a broadcast channel.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated { username: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: String },
    LoggedOut,
    /// The server rejected the session; the UI should route to login.
    Invalidated,
}

#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<RwLock<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Arc::new(RwLock::new(SessionState::Anonymous)),
            events,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.read(), SessionState::Authenticated { .. })
    }

    pub fn username(&self) -> Option<String> {
        match &*self.state.read() {
            SessionState::Authenticated { username } => Some(username.clone()),
            _ => None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn begin_authentication(&self) {
        *self.state.write() = SessionState::Authenticating;
    }

    pub(crate) fn set_authenticated(&self, username: &str) {
        *self.state.write() = SessionState::Authenticated {
            username: username.to_string(),
        };
        info!(username, "Session established");
        self.publish(SessionEvent::LoggedIn {
            username: username.to_string(),
        });
    }

    /// Local logout or failed login. Always ends in `Anonymous`.
    pub(crate) fn reset(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), SessionState::Anonymous);
        if matches!(previous, SessionState::Authenticated { .. }) {
            self.publish(SessionEvent::LoggedOut);
        }
    }

    /// Forces `Anonymous` after the server rejected the session. Publishes
    /// `Invalidated` only when a session was actually lost.
    pub fn invalidate(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), SessionState::Anonymous);
        if let SessionState::Authenticated { username } = previous {
            info!(username = %username, "Session invalidated by server");
            self.publish(SessionEvent::Invalidated);
        }
    }

    fn publish(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("No session event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine() {
        let session = SessionHandle::new();
        let mut events = session.subscribe();
        assert_eq!(session.state(), SessionState::Anonymous);

        session.begin_authentication();
        assert_eq!(session.state(), SessionState::Authenticating);

        session.set_authenticated("alice");
        assert!(session.is_authenticated());
        assert_eq!(session.username().as_deref(), Some("alice"));
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::LoggedIn {
                username: "alice".to_string()
            }
        );

        session.invalidate();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Invalidated);

        // already anonymous, nothing more to report
        session.invalidate();
        session.reset();
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_clones_share_state() {
        let session = SessionHandle::new();
        let clone = session.clone();
        clone.set_authenticated("bob");
        assert!(session.is_authenticated());
        session.reset();
        assert!(!clone.is_authenticated());
    }
}
