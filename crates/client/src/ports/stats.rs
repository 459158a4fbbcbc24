//! Statistics/metadata collaborator.
//!
//! Only the narrow lookups the engine needs: profiles (to resolve lobby
//! players and user ids), beatmaps (lobby enrichment) and matches. Every
//! lookup returns `Ok(None)` when the remote side knows nothing about the id.

use async_trait::async_trait;
use bancho_domain::GameMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StatsError {
    #[error("Statistics request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid statistics response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Id(u64),
    Name(String),
}

/// Profile enrichment for a user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub count300: u64,
    pub count100: u64,
    pub count50: u64,
    pub playcount: u32,
    pub ranked_score: u64,
    pub total_score: u64,
    pub pp_rank: u32,
    pub pp_raw: f64,
    pub accuracy: f64,
    pub count_rank_ss: u32,
    pub count_rank_s: u32,
    pub count_rank_a: u32,
    pub country: String,
    pub pp_country_rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beatmap {
    pub id: u64,
    pub beatmapset_id: u64,
    pub artist: String,
    pub title: String,
    pub version: String,
    pub creator: String,
    pub mode: GameMode,
    pub difficulty_rating: f64,
    pub bpm: f64,
    pub total_length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub id: u64,
    pub name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub games: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsApi: Send + Sync {
    async fn fetch_user(&self, lookup: UserLookup) -> Result<Option<UserProfile>, StatsError>;
    async fn fetch_beatmap(&self, id: u64) -> Result<Option<Beatmap>, StatsError>;
    async fn fetch_match(&self, id: u64) -> Result<Option<MatchInfo>, StatsError>;
}
