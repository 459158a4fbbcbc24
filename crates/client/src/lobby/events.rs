use bancho_domain::{GameMode, Mod, Score, Team, TeamMode, WinCondition, LOBBY_SLOTS};

use crate::ports::Beatmap;

use super::LobbyPlayer;

/// Snapshot of the 16 slots, 0-based.
pub type Slots = [Option<LobbyPlayer>; LOBBY_SLOTS];

/// Notifications published on a lobby's bus.
///
/// Property events fire only when the value changed.
#[derive(Debug, Clone)]
pub enum LobbyEvent {
    Name(String),
    BeatmapId(Option<u64>),
    /// Metadata fetched for the current beatmap
    Beatmap(Beatmap),
    BeatmapNotFound(u64),
    TeamMode(TeamMode),
    WinCondition(WinCondition),
    Mods(Vec<Mod>),
    Freemod(bool),
    Playing(bool),
    Size(u8),
    Gamemode(GameMode),
    Slots(Box<Slots>),
    PlayerJoined {
        player: LobbyPlayer,
        slot: usize,
        team: Option<Team>,
    },
    PlayerMoved {
        player: LobbyPlayer,
        slot: usize,
    },
    PlayerLeft(LobbyPlayer),
    PlayerChangedTeam {
        player: LobbyPlayer,
        team: Team,
    },
    /// `None` when the host was cleared
    Host(Option<LobbyPlayer>),
    HostCleared,
    AllPlayersReady,
    MatchStarted,
    PlayerFinished(Score),
    /// Scores sorted passes first, then by score
    MatchFinished(Vec<Score>),
    MatchAborted,
    InvalidBeatmap,
    PasswordRemoved,
    PasswordChanged,
    UserNotFound,
    UserNotFoundName(String),
    RefereeAdded(String),
    RefereeRemoved(String),
    SlotsLocked,
    SlotsUnlocked,
    MatchSettings {
        size: Option<u8>,
        team_mode: TeamMode,
        win_condition: Option<WinCondition>,
    },
}
