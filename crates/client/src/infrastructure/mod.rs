//! Infrastructure adapters: messaging primitives, flood control and the
//! statistics HTTP adapter.

pub mod messaging;
pub mod osu_api;
pub mod rate_limiter;
