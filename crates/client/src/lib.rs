//! Bancho Client library.
//!
//! A client engine for the osu! Bancho chat gateway and its multiplayer
//! referee bot.
//!
//! ## Structure
//!
//! - `client/` - Connection state machine, command dispatcher, outgoing pipeline
//! - `entities/` - Users, channels and messages with their registries
//! - `lobby/` - Multiplayer lobby state rebuilt from bot replies
//! - `ports/` - Statistics collaborator trait
//! - `infrastructure/` - Event buses, flood control, osu! API adapter
//! - `config` - Connection and flood-control configuration

pub mod client;
pub mod config;
pub mod entities;
pub mod error;
pub mod infrastructure;
pub mod lobby;
pub mod ports;

/// End-to-end tests against an in-process fake gateway.
#[cfg(test)]
mod e2e_tests;

pub use client::{Client, ClientEvent, Recipient};
pub use config::{ClientConfig, RateLimitConfig};
pub use error::{ClientError, ClientResult};
pub use infrastructure::messaging::ConnectionState;
pub use lobby::{Lobby, LobbyEvent, LobbyPlayer};
