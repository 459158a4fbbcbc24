//! osu! API v1 client

use async_trait::async_trait;
use bancho_domain::GameMode;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::ports::{Beatmap, MatchInfo, StatsApi, StatsError, UserLookup, UserProfile};

/// Default API base URL.
pub const DEFAULT_OSU_API_BASE_URL: &str = "https://osu.ppy.sh/api";

/// Client for the legacy v1 API.
///
/// The v1 API encodes every number as a string and answers unknown ids with
/// an empty array (or `"match": 0`), which map to `Ok(None)`.
#[derive(Clone)]
pub struct OsuApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OsuApi {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(DEFAULT_OSU_API_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, StatsError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(&[("k", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| StatsError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .map_err(|e| StatsError::RequestFailed(e.to_string()))?;
            return Err(StatsError::RequestFailed(format!("{status}: {error_text}")));
        }

        response
            .json()
            .await
            .map_err(|e| StatsError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl StatsApi for OsuApi {
    async fn fetch_user(&self, lookup: UserLookup) -> Result<Option<UserProfile>, StatsError> {
        let query = match lookup {
            UserLookup::Id(id) => [("u", id.to_string()), ("type", "id".to_string())],
            UserLookup::Name(name) => [("u", name), ("type", "string".to_string())],
        };
        let users: Vec<ApiUser> = self.get("get_user", &query).await?;
        users.into_iter().next().map(convert_user).transpose()
    }

    async fn fetch_beatmap(&self, id: u64) -> Result<Option<Beatmap>, StatsError> {
        let beatmaps: Vec<ApiBeatmap> = self.get("get_beatmaps", &[("b", id.to_string())]).await?;
        beatmaps.into_iter().next().map(convert_beatmap).transpose()
    }

    async fn fetch_match(&self, id: u64) -> Result<Option<MatchInfo>, StatsError> {
        let response: ApiMatchResponse = self.get("get_match", &[("mp", id.to_string())]).await?;
        convert_match(response)
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiUser {
    user_id: String,
    username: String,
    count300: Option<String>,
    count100: Option<String>,
    count50: Option<String>,
    playcount: Option<String>,
    ranked_score: Option<String>,
    total_score: Option<String>,
    pp_rank: Option<String>,
    pp_raw: Option<String>,
    accuracy: Option<String>,
    count_rank_ss: Option<String>,
    count_rank_s: Option<String>,
    count_rank_a: Option<String>,
    #[serde(default)]
    country: String,
    pp_country_rank: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiBeatmap {
    beatmap_id: String,
    beatmapset_id: Option<String>,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    creator: String,
    mode: Option<String>,
    difficultyrating: Option<String>,
    bpm: Option<String>,
    total_length: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMatchResponse {
    #[serde(rename = "match")]
    info: serde_json::Value,
    #[serde(default)]
    games: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiMatch {
    match_id: String,
    name: String,
    start_time: Option<String>,
    end_time: Option<String>,
}

/// Parse a string-encoded number; missing or null fields become the default.
fn number<T>(field: &str, value: Option<&String>) -> Result<T, StatsError>
where
    T: std::str::FromStr + Default,
{
    match value.map(|v| v.trim()) {
        None | Some("") => Ok(T::default()),
        Some(v) => v
            .parse()
            .map_err(|_| StatsError::InvalidResponse(format!("{field}: {v:?} is not a number"))),
    }
}

fn convert_user(user: ApiUser) -> Result<UserProfile, StatsError> {
    Ok(UserProfile {
        id: number("user_id", Some(&user.user_id))?,
        username: user.username,
        count300: number("count300", user.count300.as_ref())?,
        count100: number("count100", user.count100.as_ref())?,
        count50: number("count50", user.count50.as_ref())?,
        playcount: number("playcount", user.playcount.as_ref())?,
        ranked_score: number("ranked_score", user.ranked_score.as_ref())?,
        total_score: number("total_score", user.total_score.as_ref())?,
        pp_rank: number("pp_rank", user.pp_rank.as_ref())?,
        pp_raw: number("pp_raw", user.pp_raw.as_ref())?,
        accuracy: number("accuracy", user.accuracy.as_ref())?,
        count_rank_ss: number("count_rank_ss", user.count_rank_ss.as_ref())?,
        count_rank_s: number("count_rank_s", user.count_rank_s.as_ref())?,
        count_rank_a: number("count_rank_a", user.count_rank_a.as_ref())?,
        country: user.country,
        pp_country_rank: number("pp_country_rank", user.pp_country_rank.as_ref())?,
    })
}

fn convert_beatmap(beatmap: ApiBeatmap) -> Result<Beatmap, StatsError> {
    let mode: u8 = number("mode", beatmap.mode.as_ref())?;
    Ok(Beatmap {
        id: number("beatmap_id", Some(&beatmap.beatmap_id))?,
        beatmapset_id: number("beatmapset_id", beatmap.beatmapset_id.as_ref())?,
        artist: beatmap.artist,
        title: beatmap.title,
        version: beatmap.version,
        creator: beatmap.creator,
        mode: GameMode::from_number(mode).unwrap_or_default(),
        difficulty_rating: number("difficultyrating", beatmap.difficultyrating.as_ref())?,
        bpm: number("bpm", beatmap.bpm.as_ref())?,
        total_length: number("total_length", beatmap.total_length.as_ref())?,
    })
}

fn convert_match(response: ApiMatchResponse) -> Result<Option<MatchInfo>, StatsError> {
    // Unknown matches come back as `"match": 0`
    if !response.info.is_object() {
        return Ok(None);
    }
    let info: ApiMatch = serde_json::from_value(response.info)
        .map_err(|e| StatsError::InvalidResponse(e.to_string()))?;
    Ok(Some(MatchInfo {
        id: number("match_id", Some(&info.match_id))?,
        name: info.name,
        start_time: info.start_time,
        end_time: info.end_time,
        games: response.games.len(),
    }))
}
