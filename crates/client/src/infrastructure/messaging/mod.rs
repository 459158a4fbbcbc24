//! In-process messaging primitives: event fan-out, connection state and
//! one-shot completion tables.

pub mod connection;
pub mod event_bus;
pub mod pending;

pub use connection::ConnectionState;
pub use event_bus::{EventBus, SubscriptionId};
pub use pending::PendingRequests;
