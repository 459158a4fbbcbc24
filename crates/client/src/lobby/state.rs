//! Mutable lobby state
//!
//! Setters record a change event only when the value actually changes. The
//! owner publishes recorded events after releasing the state lock.

use std::collections::HashMap;
use std::sync::Arc;

use bancho_domain::{GameMode, Mod, PlayerState, Score, Team, TeamMode, WinCondition, LOBBY_SLOTS};
use bancho_shared::SlotStatus;
use tokio::sync::oneshot;

use crate::entities::User;
use crate::error::ClientResult;
use crate::ports::Beatmap;

use super::events::Slots;
use super::{LobbyEvent, LobbyPlayer};

/// An `!mp settings` round trip being collected.
pub(super) struct SettingsRefresh {
    /// From the `Players: N` line
    pub expected: Option<usize>,
    pub statuses: Vec<SlotStatus>,
    /// Cleared when the reply carries an active mods line
    pub initialize_mods: bool,
    pub waiters: Vec<oneshot::Sender<ClientResult<()>>>,
}

impl Default for SettingsRefresh {
    fn default() -> Self {
        Self {
            expected: None,
            statuses: Vec::new(),
            initialize_mods: true,
            waiters: Vec::new(),
        }
    }
}

pub(super) struct LobbyState {
    pub name: String,
    pub beatmap_id: Option<u64>,
    pub beatmap: Option<Beatmap>,
    pub team_mode: Option<TeamMode>,
    pub win_condition: Option<WinCondition>,
    pub mods: Vec<Mod>,
    pub freemod: bool,
    pub playing: bool,
    pub size: u8,
    pub gamemode: GameMode,
    pub scores: Vec<Score>,
    /// Player keys by slot
    pub slots: [Option<String>; LOBBY_SLOTS],
    /// Every player seen in this lobby, by user key, kept after they leave
    pub players: HashMap<String, LobbyPlayer>,
    pub players_by_id: HashMap<u64, String>,
    /// Armed once a player leaves; the next refresh may report all ready
    pub all_ready_on_refresh: bool,
    pub refresh: Option<SettingsRefresh>,
}

impl LobbyState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            beatmap_id: None,
            beatmap: None,
            team_mode: None,
            win_condition: None,
            mods: Vec::new(),
            freemod: false,
            playing: false,
            size: LOBBY_SLOTS as u8,
            gamemode: GameMode::default(),
            scores: Vec::new(),
            slots: Default::default(),
            players: HashMap::new(),
            players_by_id: HashMap::new(),
            all_ready_on_refresh: true,
            refresh: None,
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn set_name(&mut self, name: &str, events: &mut Vec<LobbyEvent>) {
        if self.name != name {
            self.name = name.to_string();
            events.push(LobbyEvent::Name(self.name.clone()));
        }
    }

    pub fn set_beatmap_id(&mut self, id: Option<u64>, events: &mut Vec<LobbyEvent>) {
        self.beatmap = None;
        if self.beatmap_id != id {
            self.beatmap_id = id;
            events.push(LobbyEvent::BeatmapId(id));
        }
    }

    /// Switching into a team mode assigns Blue to even slots and Red to odd ones.
    pub fn set_team_mode(&mut self, team_mode: TeamMode, events: &mut Vec<LobbyEvent>) {
        let had_teams = self.team_mode.is_some_and(|mode| mode.has_teams());
        if team_mode.has_teams() && !had_teams {
            for (index, key) in self.slots.iter().enumerate() {
                if let Some(player) = key.as_ref().and_then(|key| self.players.get_mut(key)) {
                    player.team = Some(Team::for_slot(index));
                }
            }
        }
        if self.team_mode != Some(team_mode) {
            self.team_mode = Some(team_mode);
            events.push(LobbyEvent::TeamMode(team_mode));
        }
    }

    pub fn set_win_condition(&mut self, win_condition: WinCondition, events: &mut Vec<LobbyEvent>) {
        if self.win_condition != Some(win_condition) {
            self.win_condition = Some(win_condition);
            events.push(LobbyEvent::WinCondition(win_condition));
        }
    }

    pub fn set_mods(&mut self, mods: Vec<Mod>, freemod: bool, events: &mut Vec<LobbyEvent>) {
        if self.mods != mods {
            self.mods = mods;
            events.push(LobbyEvent::Mods(self.mods.clone()));
        }
        if self.freemod != freemod {
            self.freemod = freemod;
            events.push(LobbyEvent::Freemod(freemod));
        }
    }

    pub fn set_size(&mut self, size: u8, events: &mut Vec<LobbyEvent>) {
        if self.size != size {
            self.size = size;
            events.push(LobbyEvent::Size(size));
        }
    }

    pub fn set_playing(&mut self, playing: bool, events: &mut Vec<LobbyEvent>) {
        if self.playing != playing {
            self.playing = playing;
            events.push(LobbyEvent::Playing(playing));
        }
    }

    pub fn set_gamemode(&mut self, gamemode: GameMode, events: &mut Vec<LobbyEvent>) {
        if self.gamemode != gamemode {
            self.gamemode = gamemode;
            events.push(LobbyEvent::Gamemode(gamemode));
        }
    }

    // =========================================================================
    // Players and slots
    // =========================================================================

    /// Register a player for `user` unless one exists; returns its key.
    pub fn add_player(&mut self, user: &Arc<User>) -> String {
        let key = user.key().to_string();
        self.players
            .entry(key.clone())
            .or_insert_with(|| LobbyPlayer::new(Arc::clone(user)));
        if let Some(id) = user.id() {
            self.players_by_id.insert(id, key.clone());
        }
        key
    }

    pub fn player(&self, key: &str) -> Option<LobbyPlayer> {
        self.players.get(key).cloned()
    }

    pub fn slot_of(&self, key: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_deref() == Some(key))
    }

    /// Players currently occupying a slot.
    pub fn slotted_mut(&mut self) -> impl Iterator<Item = &mut LobbyPlayer> + '_ {
        let slots = &self.slots;
        self.players
            .iter_mut()
            .filter(move |(key, _)| slots.iter().flatten().any(|slot| slot == *key))
            .map(|(_, player)| player)
    }

    pub fn slotted(&self) -> impl Iterator<Item = &LobbyPlayer> + '_ {
        self.slots
            .iter()
            .flatten()
            .filter_map(|key| self.players.get(key))
    }

    /// Previously ready players become not ready.
    pub fn reset_ready(&mut self) {
        for player in self.slotted_mut() {
            if player.state == PlayerState::Ready {
                player.state = PlayerState::NotReady;
            }
        }
    }

    pub fn host_key(&self) -> Option<String> {
        self.slots
            .iter()
            .flatten()
            .find(|key| self.players.get(*key).is_some_and(|player| player.host))
            .cloned()
    }

    pub fn slot_snapshot(&self) -> Slots {
        std::array::from_fn(|index| {
            self.slots[index]
                .as_ref()
                .and_then(|key| self.players.get(key))
                .cloned()
        })
    }

    pub fn slots_event(&self) -> LobbyEvent {
        LobbyEvent::Slots(Box::new(self.slot_snapshot()))
    }
}
