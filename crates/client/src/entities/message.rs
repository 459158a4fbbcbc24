use std::fmt;
use std::sync::Arc;

use super::{Channel, User};

/// Where a message was delivered.
#[derive(Clone)]
pub enum MessageTarget {
    Private { recipient: Arc<User> },
    Channel { channel: Arc<Channel> },
}

/// A chat message, received or sent by this client.
#[derive(Clone)]
pub struct Message {
    pub sender: Arc<User>,
    pub content: String,
    /// Echo of a message this client sent
    pub self_sent: bool,
    pub target: MessageTarget,
}

impl Message {
    pub fn private(sender: Arc<User>, recipient: Arc<User>, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            self_sent: false,
            target: MessageTarget::Private { recipient },
        }
    }

    pub fn channel(sender: Arc<User>, channel: Arc<Channel>, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            self_sent: false,
            target: MessageTarget::Channel { channel },
        }
    }

    pub(crate) fn sent_by_self(mut self) -> Self {
        self.self_sent = true;
        self
    }

    pub fn is_private(&self) -> bool {
        matches!(self.target, MessageTarget::Private { .. })
    }

    pub fn channel_target(&self) -> Option<&Arc<Channel>> {
        match &self.target {
            MessageTarget::Channel { channel } => Some(channel),
            MessageTarget::Private { .. } => None,
        }
    }

    pub fn recipient(&self) -> Option<&Arc<User>> {
        match &self.target {
            MessageTarget::Private { recipient } => Some(recipient),
            MessageTarget::Channel { .. } => None,
        }
    }

    /// Text of a CTCP ACTION (`/me`) message.
    pub fn action(&self) -> Option<&str> {
        self.content
            .strip_prefix("\x01ACTION ")
            .map(|rest| rest.strip_suffix('\x01').unwrap_or(rest))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.target {
            MessageTarget::Private { recipient } => recipient.name().to_string(),
            MessageTarget::Channel { channel } => channel.name().to_string(),
        };
        f.debug_struct("Message")
            .field("sender", &self.sender.name())
            .field("target", &target)
            .field("content", &self.content)
            .field("self_sent", &self.self_sent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Weak;

    fn user(name: &str) -> Arc<User> {
        Arc::new(User::new(name, Weak::new()))
    }

    #[test]
    fn test_action_text() {
        let msg = Message::private(user("a"), user("b"), "\x01ACTION waves\x01");
        assert_eq!(msg.action(), Some("waves"));

        let plain = Message::private(user("a"), user("b"), "hello");
        assert_eq!(plain.action(), None);
    }

    #[test]
    fn test_private_target() {
        let msg = Message::private(user("a"), user("b"), "hi");
        assert!(msg.is_private());
        assert_eq!(msg.recipient().map(|u| u.name().to_string()), Some("b".into()));
        assert!(msg.channel_target().is_none());
        assert!(!msg.clone().self_sent);
        assert!(msg.sent_by_self().self_sent);
    }
}
