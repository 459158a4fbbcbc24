//! Connection lifecycle states.

use std::fmt;

/// Connection state of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected to the gateway
    #[default]
    Disconnected,
    /// Transport opening or handshake in flight
    Connecting,
    /// Connection lost, waiting for the retry timer
    Reconnecting,
    /// Handshake accepted
    Connected,
}

impl ConnectionState {
    /// Whether the state machine allows `self -> next`.
    ///
    /// Entering `Reconnecting` additionally requires a triggering error; the
    /// client enforces that at the call site.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Disconnected)
                | (Connecting, Reconnecting)
                | (Connected, Reconnecting)
                | (Connected, Disconnected)
                | (Reconnecting, Connecting)
                | (Reconnecting, Disconnected)
        )
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }

    pub fn is_disconnected(self) -> bool {
        self == ConnectionState::Disconnected
    }

    /// Connected or connecting; a new `connect()` is refused in these states.
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Connecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}
