//! Multiplayer bot reply patterns
//!
//! The bot reports every lobby change as free-form chat text. Replies are
//! matched against an ordered pattern table; the first pattern whose builder
//! accepts the captures wins. Parsing is a pure function of the line.
//!
//! A line that matches a pattern textually but carries out-of-range values
//! (slot 0, slot 17, an unknown team mode) is treated as no match.

use std::sync::LazyLock;

use bancho_domain::{
    parse_long_mods, validate_size, validate_slot, Mod, PlayerState, Team, TeamMode,
    WinCondition,
};
use regex_lite::{Captures, Regex};

/// A recognised bot reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotReply {
    /// `Room name: <name>, History: https://osu.ppy.sh/mp/<id>`
    RoomName { name: String, id: u64 },
    /// `Room name updated to "<name>"`
    RoomNameUpdated { name: String },
    TeamModeWinCondition {
        team_mode: TeamMode,
        win_condition: WinCondition,
    },
    ActiveMods { mods: Vec<Mod>, freemod: bool },
    PlayersAmount(usize),
    /// A player's `!mp settings` slot line
    SlotStatus(SlotStatus),
    /// Any of the three beatmap lines (host change, referee change, settings)
    BeatmapChanged { id: u64, name: String },
    PlayerChangedTeam { name: String, team: Team },
    InvalidBeatmap,
    HostChangingMap,
    RefereeChangedMods { mods: Vec<Mod>, freemod: bool },
    /// `slot` is 0-based
    PlayerJoined {
        name: String,
        slot: usize,
        team: Option<Team>,
    },
    /// `slot` is 0-based
    PlayerMoved { name: String, slot: usize },
    PlayerLeft { name: String },
    HostChanged { name: String },
    AllPlayersReady,
    MatchStarted,
    MatchAborted,
    PlayerFinished {
        name: String,
        score: u64,
        pass: bool,
    },
    MatchFinished,
    PasswordRemoved,
    PasswordChanged,
    RefereeAdded { name: String },
    RefereeRemoved { name: String },
    UserNotFound,
    UserNotFoundName { name: String },
    SlotsLocked,
    SlotsUnlocked,
    MatchSize(u8),
    MatchSettings {
        size: Option<u8>,
        team_mode: TeamMode,
        win_condition: Option<WinCondition>,
    },
    HostCleared,
}

/// One player line of `!mp settings`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotStatus {
    /// 0-based
    pub slot: usize,
    pub state: PlayerState,
    pub user_id: u64,
    pub name: String,
    pub host: bool,
    pub team: Option<Team>,
    /// Mods listed in the flags, `None` when the line lists none
    pub mods: Option<Vec<Mod>>,
}

type Builder = fn(&Captures<'_>) -> Option<BotReply>;

fn build_pattern(source: &str, builder: Builder) -> (Regex, Builder) {
    (Regex::new(source).expect("valid regex"), builder)
}

fn text(caps: &Captures<'_>, index: usize) -> Option<String> {
    caps.get(index).map(|m| m.as_str().to_string())
}

fn number<T: std::str::FromStr>(caps: &Captures<'_>, index: usize) -> Option<T> {
    caps.get(index)?.as_str().parse().ok()
}

/// Convert a 1-based slot from bot text into a validated 0-based index.
fn slot(caps: &Captures<'_>, index: usize) -> Option<usize> {
    let one_based: usize = number(caps, index)?;
    validate_slot(one_based.checked_sub(1)?).ok()
}

static PATTERNS: LazyLock<Vec<(Regex, Builder)>> = LazyLock::new(|| {
    vec![
        build_pattern(
            r"^Room name: (.+), History: https://osu\.ppy\.sh/mp/(\d+)$",
            |c| {
                Some(BotReply::RoomName {
                    name: text(c, 1)?,
                    id: number(c, 2)?,
                })
            },
        ),
        build_pattern(r#"^Room name updated to "(.+)"$"#, |c| {
            Some(BotReply::RoomNameUpdated { name: text(c, 1)? })
        }),
        build_pattern(r"^Team mode: (\w+), Win condition: (\w+)$", |c| {
            Some(BotReply::TeamModeWinCondition {
                team_mode: c[1].parse().ok()?,
                win_condition: c[2].parse().ok()?,
            })
        }),
        build_pattern(r"^Active mods: (.+)$", |c| {
            Some(BotReply::ActiveMods {
                mods: parse_long_mods(&c[1]),
                freemod: c[1].contains("Freemod"),
            })
        }),
        build_pattern(r"^Players: (\d+)$", |c| {
            Some(BotReply::PlayersAmount(number(c, 1)?))
        }),
        build_pattern(
            r"^Slot (\d+) +(Not Ready|Ready|No Map) +https://osu\.ppy\.sh/u/(\d+) (.+)$",
            |c| {
                let (name, host, team, mods) = split_slot_flags(&c[4])?;
                Some(BotReply::SlotStatus(SlotStatus {
                    slot: slot(c, 1)?,
                    state: c[2].parse().ok()?,
                    user_id: number(c, 3)?,
                    name,
                    host,
                    team,
                    mods,
                }))
            },
        ),
        build_pattern(
            r"^Beatmap changed to: (.+) \(https://osu\.ppy\.sh/b/(\d+)\)$",
            |c| {
                Some(BotReply::BeatmapChanged {
                    id: number(c, 2)?,
                    name: text(c, 1)?,
                })
            },
        ),
        build_pattern(r"^(.+) changed to (Blue|Red)$", |c| {
            Some(BotReply::PlayerChangedTeam {
                name: text(c, 1)?,
                team: c[2].parse().ok()?,
            })
        }),
        build_pattern(r"^Changed beatmap to https://osu\.ppy\.sh/b/(\d+) (.+)$", |c| {
            Some(BotReply::BeatmapChanged {
                id: number(c, 1)?,
                name: text(c, 2)?,
            })
        }),
        build_pattern(r"^Beatmap: https://osu\.ppy\.sh/b/(\d+) (.+)$", |c| {
            Some(BotReply::BeatmapChanged {
                id: number(c, 1)?,
                name: text(c, 2)?,
            })
        }),
        build_pattern(r"^Invalid map ID provided$", |_| Some(BotReply::InvalidBeatmap)),
        build_pattern(r"^Host is changing map\.\.\.$", |_| {
            Some(BotReply::HostChangingMap)
        }),
        build_pattern(
            r"^(Enabled (.+)|Disabled all mods), (disabled|enabled) FreeMod$",
            |c| {
                Some(BotReply::RefereeChangedMods {
                    mods: c.get(2).map(|m| parse_long_mods(m.as_str())).unwrap_or_default(),
                    freemod: &c[3] == "enabled",
                })
            },
        ),
        build_pattern(r"^(.+) joined in slot (\d+)( for team (red|blue))?\.$", |c| {
            let team = match c.get(4) {
                Some(m) => Some(m.as_str().parse().ok()?),
                None => None,
            };
            Some(BotReply::PlayerJoined {
                name: text(c, 1)?,
                slot: slot(c, 2)?,
                team,
            })
        }),
        build_pattern(r"^(.+) moved to slot (\d+)$", |c| {
            Some(BotReply::PlayerMoved {
                name: text(c, 1)?,
                slot: slot(c, 2)?,
            })
        }),
        build_pattern(r"^(.+) left the game\.$", |c| {
            Some(BotReply::PlayerLeft { name: text(c, 1)? })
        }),
        build_pattern(r"^(.+) became the host\.$", |c| {
            Some(BotReply::HostChanged { name: text(c, 1)? })
        }),
        build_pattern(r"^All players are ready$", |_| Some(BotReply::AllPlayersReady)),
        build_pattern(r"^The match has started!$", |_| Some(BotReply::MatchStarted)),
        build_pattern(r"^Aborted the match$", |_| Some(BotReply::MatchAborted)),
        build_pattern(
            r"^(.+) finished playing \(Score: (\d+), (FAIL|PASS)ED\)\.$",
            |c| {
                Some(BotReply::PlayerFinished {
                    name: text(c, 1)?,
                    score: number(c, 2)?,
                    pass: &c[3] == "PASS",
                })
            },
        ),
        build_pattern(r"^The match has finished!$", |_| Some(BotReply::MatchFinished)),
        build_pattern(r"^Removed the match password$", |_| {
            Some(BotReply::PasswordRemoved)
        }),
        build_pattern(r"^Changed the match password$", |_| {
            Some(BotReply::PasswordChanged)
        }),
        build_pattern(r"^Added (.+) to the match referees$", |c| {
            Some(BotReply::RefereeAdded { name: text(c, 1)? })
        }),
        build_pattern(r"^Removed (.+) from the match referees$", |c| {
            Some(BotReply::RefereeRemoved { name: text(c, 1)? })
        }),
        build_pattern(r"^User not found$", |_| Some(BotReply::UserNotFound)),
        build_pattern(r"^User not found: (.+)$", |c| {
            Some(BotReply::UserNotFoundName { name: text(c, 1)? })
        }),
        build_pattern(r"^Locked the match$", |_| Some(BotReply::SlotsLocked)),
        build_pattern(r"^Unlocked the match$", |_| Some(BotReply::SlotsUnlocked)),
        build_pattern(r"^Changed match to size (\d+)$", |c| {
            Some(BotReply::MatchSize(validate_size(number(c, 1)?).ok()?))
        }),
        build_pattern(
            r"^Changed match settings to ((\d+) slots, )?(HeadToHead|TagCoop|TeamVs|TagTeamVs)(, (Score|Accuracy|Combo|ScoreV2))?$",
            |c| {
                let size = match c.get(2) {
                    Some(m) => Some(validate_size(m.as_str().parse().ok()?).ok()?),
                    None => None,
                };
                let win_condition = match c.get(5) {
                    Some(m) => Some(m.as_str().parse().ok()?),
                    None => None,
                };
                Some(BotReply::MatchSettings {
                    size,
                    team_mode: c[3].parse().ok()?,
                    win_condition,
                })
            },
        ),
        build_pattern(r"^Cleared match host$", |_| Some(BotReply::HostCleared)),
    ]
});

/// Match a bot line against the pattern table.
pub fn parse_bot_reply(line: &str) -> Option<BotReply> {
    PATTERNS.iter().find_map(|(regex, builder)| {
        let caps = regex.captures(line)?;
        builder(&caps)
    })
}

/// `Created the tournament match https://osu.ppy.sh/mp/<id> <name>`
pub fn parse_match_created(line: &str) -> Option<(u64, String)> {
    static CREATED: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^Created the tournament match https://osu\.ppy\.sh/mp/(\d+) (.+)$")
            .expect("valid regex")
    });
    let caps = CREATED.captures(line)?;
    Some((number(&caps, 1)?, text(&caps, 2)?))
}

type SlotFlags = (String, bool, Option<Team>, Option<Vec<Mod>>);

/// Split `<padded name> [Host / Team Blue / Hidden, HardRock]` into the name
/// and its flags. A trailing bracket that holds anything other than known
/// flags belongs to the name.
fn split_slot_flags(rest: &str) -> Option<SlotFlags> {
    let rest = rest.trim();
    let flags = rest
        .strip_suffix(']')
        .and_then(|body| body.rfind('[').map(|open| (open, &body[open + 1..])))
        .and_then(|(open, inner)| parse_flags(inner).map(|flags| (open, flags)));

    let (name, (host, team, mods)) = match flags {
        Some((open, flags)) => (rest[..open].trim_end(), flags),
        None => (rest, (false, None, None)),
    };
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), host, team, mods))
}

fn parse_flags(inner: &str) -> Option<(bool, Option<Team>, Option<Vec<Mod>>)> {
    let mut host = false;
    let mut team = None;
    let mut mods = None;

    for flag in inner.split('/').map(str::trim) {
        match flag {
            "Host" => host = true,
            "Team Blue" => team = Some(Team::Blue),
            "Team Red" => team = Some(Team::Red),
            other => {
                let parsed = parse_long_mods(other);
                if parsed.is_empty() {
                    return None;
                }
                mods = Some(parsed);
            }
        }
    }
    Some((host, team, mods))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_name() {
        assert_eq!(
            parse_bot_reply("Room name: My Lobby, History: https://osu.ppy.sh/mp/45780612"),
            Some(BotReply::RoomName {
                name: "My Lobby".into(),
                id: 45780612
            })
        );
        assert_eq!(
            parse_bot_reply(r#"Room name updated to "New Name""#),
            Some(BotReply::RoomNameUpdated {
                name: "New Name".into()
            })
        );
    }

    #[test]
    fn test_beatmap_lines_unify() {
        let expected = Some(BotReply::BeatmapChanged {
            id: 75,
            name: "Kenji Ninuma - DISCO PRINCE".into(),
        });
        assert_eq!(
            parse_bot_reply(
                "Beatmap changed to: Kenji Ninuma - DISCO PRINCE (https://osu.ppy.sh/b/75)"
            ),
            expected
        );
        assert_eq!(
            parse_bot_reply("Changed beatmap to https://osu.ppy.sh/b/75 Kenji Ninuma - DISCO PRINCE"),
            expected
        );
        assert_eq!(
            parse_bot_reply("Beatmap: https://osu.ppy.sh/b/75 Kenji Ninuma - DISCO PRINCE"),
            expected
        );
    }

    #[test]
    fn test_match_settings_with_all_fields() {
        assert_eq!(
            parse_bot_reply("Changed match settings to 7 slots, TagTeamVs, Accuracy"),
            Some(BotReply::MatchSettings {
                size: Some(7),
                team_mode: TeamMode::TagTeamVs,
                win_condition: Some(WinCondition::Accuracy),
            })
        );
    }

    #[test]
    fn test_match_settings_optional_fields() {
        assert_eq!(
            parse_bot_reply("Changed match settings to HeadToHead"),
            Some(BotReply::MatchSettings {
                size: None,
                team_mode: TeamMode::HeadToHead,
                win_condition: None,
            })
        );
        assert_eq!(parse_bot_reply("Changed match settings to 17 slots, TeamVs"), None);
    }

    #[test]
    fn test_player_joined_with_and_without_team() {
        assert_eq!(
            parse_bot_reply("Some Player joined in slot 5."),
            Some(BotReply::PlayerJoined {
                name: "Some Player".into(),
                slot: 4,
                team: None
            })
        );
        assert_eq!(
            parse_bot_reply("Some Player joined in slot 2 for team red."),
            Some(BotReply::PlayerJoined {
                name: "Some Player".into(),
                slot: 1,
                team: Some(Team::Red)
            })
        );
    }

    #[test]
    fn test_out_of_range_slots_are_no_match() {
        assert_eq!(parse_bot_reply("Someone joined in slot 0."), None);
        assert_eq!(parse_bot_reply("Someone joined in slot 17."), None);
        assert_eq!(parse_bot_reply("Someone moved to slot 99"), None);
    }

    #[test]
    fn test_player_lifecycle_lines() {
        assert_eq!(
            parse_bot_reply("peppy moved to slot 3"),
            Some(BotReply::PlayerMoved {
                name: "peppy".into(),
                slot: 2
            })
        );
        assert_eq!(
            parse_bot_reply("peppy left the game."),
            Some(BotReply::PlayerLeft { name: "peppy".into() })
        );
        assert_eq!(
            parse_bot_reply("peppy became the host."),
            Some(BotReply::HostChanged { name: "peppy".into() })
        );
        assert_eq!(
            parse_bot_reply("peppy changed to Blue"),
            Some(BotReply::PlayerChangedTeam {
                name: "peppy".into(),
                team: Team::Blue
            })
        );
    }

    #[test]
    fn test_player_finished() {
        assert_eq!(
            parse_bot_reply("peppy finished playing (Score: 727727, PASSED)."),
            Some(BotReply::PlayerFinished {
                name: "peppy".into(),
                score: 727727,
                pass: true
            })
        );
        assert_eq!(
            parse_bot_reply("peppy finished playing (Score: 1, FAILED)."),
            Some(BotReply::PlayerFinished {
                name: "peppy".into(),
                score: 1,
                pass: false
            })
        );
    }

    #[test]
    fn test_mods_lines() {
        assert_eq!(
            parse_bot_reply("Active mods: Hidden, DoubleTime, Freemod"),
            Some(BotReply::ActiveMods {
                mods: vec![Mod::HIDDEN, Mod::DOUBLE_TIME],
                freemod: true
            })
        );
        assert_eq!(
            parse_bot_reply("Enabled Hidden, HardRock, disabled FreeMod"),
            Some(BotReply::RefereeChangedMods {
                mods: vec![Mod::HIDDEN, Mod::HARD_ROCK],
                freemod: false
            })
        );
        assert_eq!(
            parse_bot_reply("Disabled all mods, enabled FreeMod"),
            Some(BotReply::RefereeChangedMods {
                mods: vec![],
                freemod: true
            })
        );
    }

    #[test]
    fn test_fixed_lines() {
        let cases = [
            ("Invalid map ID provided", BotReply::InvalidBeatmap),
            ("Host is changing map...", BotReply::HostChangingMap),
            ("All players are ready", BotReply::AllPlayersReady),
            ("The match has started!", BotReply::MatchStarted),
            ("Aborted the match", BotReply::MatchAborted),
            ("The match has finished!", BotReply::MatchFinished),
            ("Removed the match password", BotReply::PasswordRemoved),
            ("Changed the match password", BotReply::PasswordChanged),
            ("User not found", BotReply::UserNotFound),
            ("Locked the match", BotReply::SlotsLocked),
            ("Unlocked the match", BotReply::SlotsUnlocked),
            ("Cleared match host", BotReply::HostCleared),
            ("Changed match to size 8", BotReply::MatchSize(8)),
            ("Players: 3", BotReply::PlayersAmount(3)),
        ];
        for (line, expected) in cases {
            assert_eq!(parse_bot_reply(line), Some(expected), "line: {line}");
        }
    }

    #[test]
    fn test_referee_lines() {
        assert_eq!(
            parse_bot_reply("Added peppy to the match referees"),
            Some(BotReply::RefereeAdded { name: "peppy".into() })
        );
        assert_eq!(
            parse_bot_reply("Removed peppy from the match referees"),
            Some(BotReply::RefereeRemoved { name: "peppy".into() })
        );
        assert_eq!(
            parse_bot_reply("User not found: nobody"),
            Some(BotReply::UserNotFoundName { name: "nobody".into() })
        );
    }

    #[test]
    fn test_slot_status_with_flags() {
        let reply = parse_bot_reply(
            "Slot 1  Not Ready https://osu.ppy.sh/u/2       peppy           [Host / Team Blue / Hidden, HardRock]",
        );
        assert_eq!(
            reply,
            Some(BotReply::SlotStatus(SlotStatus {
                slot: 0,
                state: PlayerState::NotReady,
                user_id: 2,
                name: "peppy".into(),
                host: true,
                team: Some(Team::Blue),
                mods: Some(vec![Mod::HIDDEN, Mod::HARD_ROCK]),
            }))
        );
    }

    #[test]
    fn test_slot_status_without_flags_keeps_bracketed_name() {
        let reply = parse_bot_reply("Slot 16 Ready     https://osu.ppy.sh/u/9 [Toy]           ");
        assert_eq!(
            reply,
            Some(BotReply::SlotStatus(SlotStatus {
                slot: 15,
                state: PlayerState::Ready,
                user_id: 9,
                name: "[Toy]".into(),
                host: false,
                team: None,
                mods: None,
            }))
        );
    }

    #[test]
    fn test_match_created() {
        assert_eq!(
            parse_match_created("Created the tournament match https://osu.ppy.sh/mp/123 my lobby"),
            Some((123, "my lobby".to_string()))
        );
        assert_eq!(parse_match_created("Created something else"), None);
    }

    #[test]
    fn test_unknown_lines_do_not_match() {
        assert_eq!(parse_bot_reply("Hello there"), None);
        assert_eq!(parse_bot_reply("Team mode: Chaos, Win condition: Score"), None);
    }

    #[test]
    fn test_parsing_is_pure() {
        let line = "Changed match settings to 7 slots, TagTeamVs, Accuracy";
        assert_eq!(parse_bot_reply(line), parse_bot_reply(line));
    }
}
