//! Replies to the bot's `!stats <name>` command and whois profile URLs.

use std::sync::LazyLock;

use regex_lite::Regex;

/// One line of a `!stats` answer. The answer ends with [`StatsReply::Accuracy`].
#[derive(Debug, Clone, PartialEq)]
pub enum StatsReply {
    Header {
        username: String,
        user_id: u64,
        /// In-game status (`Idle`, `Playing`, ...), absent when offline
        status: Option<String>,
    },
    Score { ranked_score: u64, rank: u32 },
    Plays { playcount: u32, level: u32 },
    Accuracy(f64),
    UserNotFound,
}

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Stats for \((.+)\)\[https://osu\.ppy\.sh/u/(\d+)\]( is (.+))?:")
        .expect("valid regex")
});
static SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Score: {4}(.+) \(#(\d+)\)").expect("valid regex"));
static PLAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Plays: {4}(\d+) \(lv(\d+)\)").expect("valid regex"));
static ACCURACY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Accuracy: (\d+(\.\d+)?)%").expect("valid regex"));
static PROFILE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://osu\.ppy\.sh/u/(\d+)$").expect("valid regex"));

pub fn parse_stats_reply(line: &str) -> Option<StatsReply> {
    if line == "User not found" {
        return Some(StatsReply::UserNotFound);
    }
    if let Some(caps) = HEADER.captures(line) {
        return Some(StatsReply::Header {
            username: caps[1].to_string(),
            user_id: caps[2].parse().ok()?,
            status: caps.get(4).map(|m| m.as_str().to_string()),
        });
    }
    if let Some(caps) = SCORE.captures(line) {
        return Some(StatsReply::Score {
            ranked_score: caps[1].replace(',', "").parse().ok()?,
            rank: caps[2].parse().ok()?,
        });
    }
    if let Some(caps) = PLAYS.captures(line) {
        return Some(StatsReply::Plays {
            playcount: caps[1].parse().ok()?,
            level: caps[2].parse().ok()?,
        });
    }
    let caps = ACCURACY.captures(line)?;
    Some(StatsReply::Accuracy(caps[1].parse().ok()?))
}

/// User id from the `https://osu.ppy.sh/u/<id>` field of a whois reply.
pub fn parse_profile_url(url: &str) -> Option<u64> {
    PROFILE_URL.captures(url)?[1].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_online_and_offline() {
        assert_eq!(
            parse_stats_reply("Stats for (Some Player)[https://osu.ppy.sh/u/123] is Playing:"),
            Some(StatsReply::Header {
                username: "Some Player".into(),
                user_id: 123,
                status: Some("Playing".into())
            })
        );
        assert_eq!(
            parse_stats_reply("Stats for (peppy)[https://osu.ppy.sh/u/2]:"),
            Some(StatsReply::Header {
                username: "peppy".into(),
                user_id: 2,
                status: None
            })
        );
    }

    #[test]
    fn test_score_plays_accuracy() {
        assert_eq!(
            parse_stats_reply("Score:    1,234,567 (#42)"),
            Some(StatsReply::Score {
                ranked_score: 1234567,
                rank: 42
            })
        );
        assert_eq!(
            parse_stats_reply("Plays:    9001 (lv100)"),
            Some(StatsReply::Plays {
                playcount: 9001,
                level: 100
            })
        );
        assert_eq!(
            parse_stats_reply("Accuracy: 98.76%"),
            Some(StatsReply::Accuracy(98.76))
        );
        assert_eq!(parse_stats_reply("User not found"), Some(StatsReply::UserNotFound));
        assert_eq!(parse_stats_reply("something else"), None);
    }

    #[test]
    fn test_profile_url() {
        assert_eq!(parse_profile_url("https://osu.ppy.sh/u/2"), Some(2));
        assert_eq!(parse_profile_url("http://osu.ppy.sh/u/124493"), Some(124493));
        assert_eq!(parse_profile_url("https://example.com/u/2"), None);
    }
}
