//! Client error type.
//!
//! `ClientError` is `Clone` so the same value can be handed to a pending
//! caller and published to observers.

use std::io;
use std::sync::Arc;

use bancho_domain::DomainError;

use crate::ports::StatsError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Socket refused, reset, closed or idle for too long
    #[error("Transport error: {0}")]
    Transport(Arc<io::Error>),

    /// The gateway rejected the credentials. Terminal, no retry.
    #[error("Bancho authentication failed")]
    AuthenticationFailed,

    #[error("Already connected or connecting")]
    AlreadyConnected,

    #[error("Currently disconnected")]
    Disconnected,

    #[error("No such channel: {0}")]
    ChannelNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Rejected before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid map ID provided")]
    InvalidBeatmap,

    #[error("Statistics API key is missing")]
    StatsUnavailable,

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Client was dropped")]
    ClientDropped,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ClientError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn connection_closed() -> Self {
        Self::Transport(Arc::new(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "Connection closed",
        )))
    }

    pub(crate) fn connect_timeout() -> Self {
        Self::Transport(Arc::new(io::Error::new(
            io::ErrorKind::TimedOut,
            "Connect timed out",
        )))
    }

    pub(crate) fn idle_timeout() -> Self {
        Self::Transport(Arc::new(io::Error::new(
            io::ErrorKind::TimedOut,
            "Timeout reached",
        )))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        Self::Transport(Arc::new(err))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
