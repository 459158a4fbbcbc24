//! Users, channels and messages.

mod channel;
mod message;
pub(crate) mod registry;
mod user;

pub use channel::{Channel, ChannelEvent, ChannelMember, MemberMode};
pub use message::{Message, MessageTarget};
pub use user::{BotStats, User, WhoisReply};
