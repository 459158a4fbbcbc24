//! Outbound ports of the client.

mod stats;

pub use stats::{Beatmap, MatchInfo, StatsApi, StatsError, UserLookup, UserProfile};

#[cfg(test)]
pub use stats::MockStatsApi;
