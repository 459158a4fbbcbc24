use std::sync::Arc;

use crate::entities::{Channel, Message, User};
use crate::error::ClientError;
use crate::infrastructure::messaging::ConnectionState;

/// Notifications published on the client's bus.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Every connection transition, with its triggering error if any
    State {
        state: ConnectionState,
        error: Option<ClientError>,
    },
    Connected,
    Disconnected {
        error: Option<ClientError>,
    },
    /// A private message received, or sent by this client (`self_sent`)
    PrivateMessage(Message),
    /// A channel message received, or sent by this client (`self_sent`)
    ChannelMessage(Message),
    /// A private message the gateway bounced back undelivered
    RejectedMessage(Message),
    Join {
        user: Arc<User>,
        channel: Arc<Channel>,
    },
    Part {
        user: Arc<User>,
        channel: Arc<Channel>,
    },
    Quit {
        user: Arc<User>,
    },
    ChannelNotFound(String),
    UserNotFound(String),
    /// Errors raised by background work (lookups, enrichment)
    Error(ClientError),
}
