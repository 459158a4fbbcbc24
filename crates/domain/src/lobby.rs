//! Multiplayer lobby vocabulary
//!
//! Enumerations shared by the bot reply parser and the lobby synchronizer.
//! Numeric values are the ones `!mp set` and `!mp map` expect; names are the
//! ones the bot prints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Number of slots in every multiplayer lobby.
pub const LOBBY_SLOTS: usize = 16;

// ============================================================================
// TeamMode
// ============================================================================

/// Team structuring rule of a lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamMode {
    HeadToHead,
    TagCoop,
    TeamVs,
    TagTeamVs,
}

impl TeamMode {
    /// Value used by `!mp set`
    pub fn as_number(&self) -> u8 {
        match self {
            TeamMode::HeadToHead => 0,
            TeamMode::TagCoop => 1,
            TeamMode::TeamVs => 2,
            TeamMode::TagTeamVs => 3,
        }
    }

    pub fn from_number(value: u8) -> Option<Self> {
        match value {
            0 => Some(TeamMode::HeadToHead),
            1 => Some(TeamMode::TagCoop),
            2 => Some(TeamMode::TeamVs),
            3 => Some(TeamMode::TagTeamVs),
            _ => None,
        }
    }

    /// Whether players are split between Blue and Red in this mode
    pub fn has_teams(&self) -> bool {
        matches!(self, TeamMode::TeamVs | TeamMode::TagTeamVs)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TeamMode::HeadToHead => "HeadToHead",
            TeamMode::TagCoop => "TagCoop",
            TeamMode::TeamVs => "TeamVs",
            TeamMode::TagTeamVs => "TagTeamVs",
        }
    }
}

impl fmt::Display for TeamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HeadToHead" => Ok(TeamMode::HeadToHead),
            "TagCoop" => Ok(TeamMode::TagCoop),
            "TeamVs" => Ok(TeamMode::TeamVs),
            "TagTeamVs" => Ok(TeamMode::TagTeamVs),
            _ => Err(DomainError::parse(format!("Unknown team mode: {s}"))),
        }
    }
}

// ============================================================================
// WinCondition
// ============================================================================

/// Match scoring rule of a lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinCondition {
    Score,
    Accuracy,
    Combo,
    ScoreV2,
}

impl WinCondition {
    /// Value used by `!mp set`
    pub fn as_number(&self) -> u8 {
        match self {
            WinCondition::Score => 0,
            WinCondition::Accuracy => 1,
            WinCondition::Combo => 2,
            WinCondition::ScoreV2 => 3,
        }
    }

    pub fn from_number(value: u8) -> Option<Self> {
        match value {
            0 => Some(WinCondition::Score),
            1 => Some(WinCondition::Accuracy),
            2 => Some(WinCondition::Combo),
            3 => Some(WinCondition::ScoreV2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WinCondition::Score => "Score",
            WinCondition::Accuracy => "Accuracy",
            WinCondition::Combo => "Combo",
            WinCondition::ScoreV2 => "ScoreV2",
        }
    }
}

impl fmt::Display for WinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WinCondition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Score" => Ok(WinCondition::Score),
            "Accuracy" => Ok(WinCondition::Accuracy),
            "Combo" => Ok(WinCondition::Combo),
            "ScoreV2" => Ok(WinCondition::ScoreV2),
            _ => Err(DomainError::parse(format!("Unknown win condition: {s}"))),
        }
    }
}

// ============================================================================
// PlayerState
// ============================================================================

/// Ready state of a player occupying a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PlayerState {
    Ready,
    #[default]
    NotReady,
    NoMap,
}

impl PlayerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerState::Ready => "Ready",
            PlayerState::NotReady => "Not Ready",
            PlayerState::NoMap => "No Map",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ready" => Ok(PlayerState::Ready),
            "Not Ready" => Ok(PlayerState::NotReady),
            "No Map" => Ok(PlayerState::NoMap),
            _ => Err(DomainError::parse(format!("Unknown player state: {s}"))),
        }
    }
}

// ============================================================================
// Team
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Blue => "Blue",
            Team::Red => "Red",
        }
    }

    /// Team assigned to a slot when a lobby switches into a team mode.
    pub fn for_slot(slot: usize) -> Self {
        if slot % 2 == 0 {
            Team::Blue
        } else {
            Team::Red
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = DomainError;

    /// Case-insensitive: `joined in slot N for team red` uses lowercase names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("blue") {
            Ok(Team::Blue)
        } else if s.eq_ignore_ascii_case("red") {
            Ok(Team::Red)
        } else {
            Err(DomainError::parse(format!("Unknown team: {s}")))
        }
    }
}

// ============================================================================
// GameMode
// ============================================================================

/// Ruleset selected by `!mp map <id> <mode>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GameMode {
    #[default]
    Osu,
    Taiko,
    CatchTheBeat,
    Mania,
}

impl GameMode {
    pub fn as_number(&self) -> u8 {
        match self {
            GameMode::Osu => 0,
            GameMode::Taiko => 1,
            GameMode::CatchTheBeat => 2,
            GameMode::Mania => 3,
        }
    }

    pub fn from_number(value: u8) -> Option<Self> {
        match value {
            0 => Some(GameMode::Osu),
            1 => Some(GameMode::Taiko),
            2 => Some(GameMode::CatchTheBeat),
            3 => Some(GameMode::Mania),
            _ => None,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMode::Osu => write!(f, "osu"),
            GameMode::Taiko => write!(f, "taiko"),
            GameMode::CatchTheBeat => write!(f, "ctb"),
            GameMode::Mania => write!(f, "mania"),
        }
    }
}

// ============================================================================
// Validation helpers
// ============================================================================

/// Validate a 0-based slot index.
pub fn validate_slot(slot: usize) -> Result<usize, DomainError> {
    if slot < LOBBY_SLOTS {
        Ok(slot)
    } else {
        Err(DomainError::SlotOutOfRange(slot))
    }
}

/// Validate a lobby size (number of open slots).
pub fn validate_size(size: u32) -> Result<u8, DomainError> {
    match u8::try_from(size) {
        Ok(size) if (1..=LOBBY_SLOTS as u8).contains(&size) => Ok(size),
        _ => Err(DomainError::SizeOutOfRange(size)),
    }
}
