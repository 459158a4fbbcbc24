//! Bancho Shared - wire contracts of the gateway
//!
//! This crate holds everything that is a pure function of protocol text:
//! - Line framing of the inbound byte stream
//! - Protocol line parsing (`[:prefix] VERB params [:trailing]`)
//! - Outgoing command framing and sanitisation
//! - The ordered pattern table for multiplayer bot replies
//! - `!stats` reply parsing
//!
//! # Design Principles
//!
//! 1. **No I/O** - callers own sockets, timers and state
//! 2. **Deterministic** - identical input always yields identical output
//! 3. **Injection safe** - every outgoing argument is sanitised before framing

pub mod bot_replies;
pub mod framer;
pub mod line;
pub mod outgoing;
pub mod stats_replies;

pub use bot_replies::{parse_bot_reply, parse_match_created, BotReply, SlotStatus};
pub use framer::LineFramer;
pub use line::{IrcLine, LineError};
pub use outgoing::{sanitize_body, sanitize_target, Command};
pub use stats_replies::{parse_profile_url, parse_stats_reply, StatsReply};
