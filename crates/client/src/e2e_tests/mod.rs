//! End-to-end tests.
//!
//! Each test drives a real [`crate::Client`] over TCP against an in-process
//! fake gateway bound to `127.0.0.1:0`, with an in-memory statistics
//! collaborator.
//!
//! ```bash
//! cargo test -p bancho-client --lib e2e_tests
//! ```

mod e2e_helpers;
mod lobby_flow_tests;
mod user_lookup_tests;

pub use e2e_helpers::*;
