//! Bot reply handling
//!
//! Property updates apply synchronously in arrival order. Anything that has
//! to resolve a player goes through the slot queue so that later lines never
//! overtake a pending lookup.

use std::sync::Arc;

use bancho_domain::{sort_scores, user_key, PlayerState, Score, Team, LOBBY_SLOTS};
use bancho_shared::{parse_bot_reply, BotReply, SlotStatus};

use crate::error::{ClientError, ClientResult};

use super::state::SettingsRefresh;
use super::{Confirmation, Lobby, LobbyEvent};

impl Lobby {
    /// Apply one line written by the bot in this lobby's channel.
    pub(crate) fn handle_bot_message(&self, content: &str) {
        let Some(reply) = parse_bot_reply(content) else {
            return;
        };
        tracing::trace!(lobby = self.id, reply = ?reply, "Bot reply");

        match reply {
            BotReply::RoomName { name, .. } | BotReply::RoomNameUpdated { name } => {
                self.update(|state, events| state.set_name(&name, events));
                self.confirm(&Confirmation::Name(name), Ok(()));
            }
            BotReply::TeamModeWinCondition {
                team_mode,
                win_condition,
            } => self.update(|state, events| {
                state.set_team_mode(team_mode, events);
                state.set_win_condition(win_condition, events);
            }),
            BotReply::ActiveMods { mods, freemod } => {
                self.update(|state, events| {
                    state.set_mods(mods, freemod, events);
                    if let Some(refresh) = state.refresh.as_mut() {
                        refresh.initialize_mods = false;
                    }
                });
                self.confirm(&Confirmation::Mods, Ok(()));
            }
            BotReply::PlayersAmount(amount) => self.on_players_amount(amount),
            BotReply::SlotStatus(status) => self.on_slot_status(status),
            BotReply::BeatmapChanged { id, .. } => {
                let changed = self.update(|state, events| {
                    if state.beatmap_id == Some(id) {
                        return false;
                    }
                    state.set_beatmap_id(Some(id), events);
                    for player in state.slotted_mut() {
                        player.state = PlayerState::NotReady;
                    }
                    true
                });
                if changed {
                    self.fetch_beatmap(id);
                }
                self.confirm(&Confirmation::Map, Ok(()));
            }
            BotReply::InvalidBeatmap => {
                self.emit(LobbyEvent::InvalidBeatmap);
                self.confirm(&Confirmation::Map, Err(ClientError::InvalidBeatmap));
            }
            BotReply::HostChangingMap => {
                self.update(|state, events| state.set_beatmap_id(None, events));
            }
            BotReply::RefereeChangedMods { mods, freemod } => {
                self.update(|state, events| {
                    state.set_mods(mods, freemod, events);
                    state.reset_ready();
                });
                self.confirm(&Confirmation::Mods, Ok(()));
            }
            BotReply::PlayerJoined { name, slot, team } => self.on_player_joined(name, slot, team),
            BotReply::PlayerMoved { name, slot } => self.on_player_moved(name, slot),
            BotReply::PlayerLeft { name } => self.on_player_left(name),
            BotReply::HostChanged { name } => self.on_host_changed(name),
            BotReply::PlayerChangedTeam { name, team } => self.on_player_changed_team(name, team),
            BotReply::HostCleared => {
                self.update(|state, events| {
                    for player in state.players.values_mut() {
                        player.host = false;
                    }
                    events.push(LobbyEvent::HostCleared);
                    events.push(LobbyEvent::Host(None));
                });
                self.confirm(&Confirmation::ClearHost, Ok(()));
            }
            BotReply::AllPlayersReady => self.update(|state, events| {
                for player in state.slotted_mut() {
                    player.state = PlayerState::Ready;
                }
                state.all_ready_on_refresh = false;
                events.push(LobbyEvent::AllPlayersReady);
            }),
            BotReply::MatchStarted => {
                self.update(|state, events| {
                    for player in state.slotted_mut() {
                        if player.state == PlayerState::Ready {
                            player.state = PlayerState::NotReady;
                            player.score = None;
                        }
                    }
                    state.scores.clear();
                    state.set_playing(true, events);
                    events.push(LobbyEvent::MatchStarted);
                });
                self.confirm(&Confirmation::Start, Ok(()));
            }
            BotReply::PlayerFinished { name, score, pass } => self.on_player_finished(name, score, pass),
            BotReply::MatchFinished => self.on_match_finished(),
            BotReply::MatchAborted => {
                self.update(|state, events| {
                    state.set_playing(false, events);
                    events.push(LobbyEvent::MatchAborted);
                });
                self.confirm(&Confirmation::Abort, Ok(()));
            }
            BotReply::PasswordRemoved => {
                self.emit(LobbyEvent::PasswordRemoved);
                self.confirm(&Confirmation::Password, Ok(()));
            }
            BotReply::PasswordChanged => {
                self.emit(LobbyEvent::PasswordChanged);
                self.confirm(&Confirmation::Password, Ok(()));
            }
            BotReply::RefereeAdded { name } => self.emit(LobbyEvent::RefereeAdded(name)),
            BotReply::RefereeRemoved { name } => self.emit(LobbyEvent::RefereeRemoved(name)),
            BotReply::UserNotFound => self.emit(LobbyEvent::UserNotFound),
            BotReply::UserNotFoundName { name } => self.emit(LobbyEvent::UserNotFoundName(name)),
            BotReply::SlotsLocked => {
                self.emit(LobbyEvent::SlotsLocked);
                self.confirm(&Confirmation::Lock, Ok(()));
            }
            BotReply::SlotsUnlocked => {
                self.emit(LobbyEvent::SlotsUnlocked);
                self.confirm(&Confirmation::Unlock, Ok(()));
            }
            BotReply::MatchSize(size) => {
                self.update(|state, events| state.set_size(size, events));
                self.confirm(&Confirmation::Size(size), Ok(()));
            }
            BotReply::MatchSettings {
                size,
                team_mode,
                win_condition,
            } => {
                self.update(|state, events| {
                    state.set_team_mode(team_mode, events);
                    if let Some(win_condition) = win_condition {
                        state.set_win_condition(win_condition, events);
                    }
                    if let Some(size) = size {
                        state.set_size(size, events);
                    }
                    state.reset_ready();
                    events.push(LobbyEvent::MatchSettings {
                        size,
                        team_mode,
                        win_condition,
                    });
                });
                self.confirm(
                    &Confirmation::Settings {
                        team_mode,
                        win_condition,
                        size,
                    },
                    Ok(()),
                );
                if let Some(size) = size {
                    self.confirm(&Confirmation::Size(size), Ok(()));
                }
            }
        }
    }

    fn fetch_beatmap(&self, id: u64) {
        let Some(stats) = self.client.upgrade().and_then(|client| client.stats.clone()) else {
            return;
        };
        let lobby = self.me.clone();
        tokio::spawn(async move {
            let result = stats.fetch_beatmap(id).await;
            let Some(lobby) = lobby.upgrade() else {
                return;
            };
            match result {
                Ok(Some(beatmap)) => lobby.update(|state, events| {
                    // A newer map may have been selected meanwhile
                    if state.beatmap_id == Some(id) {
                        state.beatmap = Some(beatmap.clone());
                        events.push(LobbyEvent::Beatmap(beatmap));
                    }
                }),
                Ok(None) => lobby.emit(LobbyEvent::BeatmapNotFound(id)),
                Err(err) => lobby.report(err.into()),
            }
        });
    }

    // =========================================================================
    // Player resolution
    // =========================================================================

    /// Key of the player named `name`, creating it through the player queue.
    async fn resolve_player(self: &Arc<Self>, name: String) -> ClientResult<String> {
        let key = user_key(&name);
        let known = self.state().players.contains_key(&key);
        if known {
            return Ok(key);
        }
        let lobby = Arc::clone(self);
        self.player_queue
            .run(async move { lobby.create_player(name).await })
            .await?
    }

    async fn create_player(&self, name: String) -> ClientResult<String> {
        let key = user_key(&name);
        let known = self.state().players.contains_key(&key);
        if known {
            return Ok(key);
        }

        let user = self.client()?.user(&name);
        if user.id().is_none() {
            user.fetch_profile().await?;
        }
        tracing::debug!(lobby = self.id, player = %user.name(), id = ?user.id(), "Player resolved");
        Ok(self.update(|state, _| state.add_player(&user)))
    }

    /// Resolve `name` on the slot queue, then apply `update` to the state.
    fn with_player(
        &self,
        name: String,
        update: impl FnOnce(&Lobby, &str) + Send + 'static,
    ) {
        let lobby = self.me.clone();
        self.slot_queue.push(async move {
            let Some(lobby) = lobby.upgrade() else {
                return;
            };
            match lobby.resolve_player(name).await {
                Ok(key) => update(&*lobby, key.as_str()),
                Err(err) => lobby.report(err),
            }
        });
    }

    // =========================================================================
    // Slot updates
    // =========================================================================

    fn on_player_joined(&self, name: String, slot: usize, team: Option<Team>) {
        self.with_player(name, move |lobby, key| {
            lobby.update(|state, events| {
                let Some(player) = state.players.get_mut(key) else {
                    return;
                };
                player.reset();
                player.team = team;
                if let Some(previous) = state.slot_of(key) {
                    state.slots[previous] = None;
                }
                state.slots[slot] = Some(key.to_string());
                if let Some(player) = state.player(key) {
                    events.push(LobbyEvent::PlayerJoined { player, slot, team });
                }
                events.push(state.slots_event());
            });
        });
    }

    fn on_player_moved(&self, name: String, slot: usize) {
        self.with_player(name, move |lobby, key| {
            lobby.update(|state, events| {
                let previous = state.slot_of(key);
                state.slots[slot] = Some(key.to_string());
                if let Some(previous) = previous.filter(|previous| *previous != slot) {
                    state.slots[previous] = None;
                }
                if let Some(player) = state.player(key) {
                    events.push(LobbyEvent::PlayerMoved { player, slot });
                }
                events.push(state.slots_event());
            });
        });
    }

    fn on_player_left(&self, name: String) {
        self.with_player(name, move |lobby, key| {
            let was_host = lobby.update(|state, events| {
                if let Some(slot) = state.slot_of(key) {
                    state.slots[slot] = None;
                }
                state.all_ready_on_refresh = true;
                let Some(player) = state.players.get_mut(key) else {
                    return false;
                };
                let was_host = std::mem::take(&mut player.host);
                let snapshot = player.clone();
                events.push(LobbyEvent::PlayerLeft(snapshot));
                if was_host {
                    events.push(LobbyEvent::HostCleared);
                    events.push(LobbyEvent::Host(None));
                }
                events.push(state.slots_event());
                was_host
            });
            if was_host {
                lobby.confirm(&Confirmation::ClearHost, Ok(()));
            }
        });
    }

    fn on_host_changed(&self, name: String) {
        self.with_player(name, move |lobby, key| {
            lobby.update(|state, events| {
                for (player_key, player) in state.players.iter_mut() {
                    player.host = player_key == key;
                }
                events.push(LobbyEvent::Host(state.player(key)));
            });
        });
    }

    fn on_player_changed_team(&self, name: String, team: Team) {
        self.with_player(name, move |lobby, key| {
            lobby.update(|state, events| {
                let Some(player) = state.players.get_mut(key) else {
                    return;
                };
                if player.team == Some(team) {
                    return;
                }
                player.team = Some(team);
                state.reset_ready();
                if let Some(player) = state.player(key) {
                    events.push(LobbyEvent::PlayerChangedTeam { player, team });
                }
            });
        });
    }

    fn on_player_finished(&self, name: String, score: u64, pass: bool) {
        self.with_player(name, move |lobby, key| {
            lobby.update(|state, events| {
                let Some(player) = state.players.get_mut(key) else {
                    return;
                };
                let score = Score::new(player.name(), score, pass);
                player.score = Some(score.clone());
                state.scores.push(score.clone());
                events.push(LobbyEvent::PlayerFinished(score));
            });
        });
    }

    /// Queued behind every pending finish line so the result is complete.
    fn on_match_finished(&self) {
        let lobby = self.me.clone();
        self.slot_queue.push(async move {
            let Some(lobby) = lobby.upgrade() else {
                return;
            };
            lobby.update(|state, events| {
                sort_scores(&mut state.scores);
                state.set_playing(false, events);
                events.push(LobbyEvent::MatchFinished(state.scores.clone()));
            });
        });
    }

    // =========================================================================
    // Settings refresh
    // =========================================================================

    fn on_players_amount(&self, amount: usize) {
        let complete = match self.state().refresh.as_mut() {
            Some(refresh) if refresh.expected.is_none() => {
                refresh.expected = Some(amount);
                amount == 0
            }
            _ => false,
        };
        if complete {
            self.complete_refresh();
        }
    }

    fn on_slot_status(&self, status: SlotStatus) {
        let complete = match self.state().refresh.as_mut() {
            Some(SettingsRefresh {
                expected: Some(expected),
                statuses,
                ..
            }) => {
                statuses.push(status);
                statuses.len() >= *expected
            }
            _ => false,
        };
        if complete {
            self.complete_refresh();
        }
    }

    fn complete_refresh(&self) {
        let Some(refresh) = self.state().refresh.take() else {
            return;
        };
        let lobby = self.me.clone();
        self.slot_queue.push(async move {
            if let Some(lobby) = lobby.upgrade() {
                lobby.apply_refresh(refresh);
            }
        });
    }

    /// Replace the slot array with the collected `!mp settings` listing.
    fn apply_refresh(&self, refresh: SettingsRefresh) {
        let client = match self.client() {
            Ok(client) => client,
            Err(err) => {
                for waiter in refresh.waiters {
                    let _ = waiter.send(Err(err.clone()));
                }
                return;
            }
        };

        self.update(|state, events| {
            let mut slots: [Option<String>; LOBBY_SLOTS] = Default::default();
            for status in &refresh.statuses {
                let key = match state.players_by_id.get(&status.user_id) {
                    Some(key) => key.clone(),
                    None => {
                        let user = client.user(&status.name);
                        user.learn_id(status.user_id);
                        state.add_player(&user)
                    }
                };
                let lobby_mods = if state.freemod {
                    Vec::new()
                } else {
                    state.mods.clone()
                };
                if let Some(player) = state.players.get_mut(&key) {
                    player.state = status.state;
                    player.host = status.host;
                    player.team = status.team;
                    player.mods = status.mods.clone().unwrap_or(lobby_mods);
                }
                slots[status.slot] = Some(key);
            }
            state.slots = slots;

            let seated = state.slotted().count();
            let none_waiting = state
                .slotted()
                .all(|player| player.state != PlayerState::NotReady);
            if state.all_ready_on_refresh && seated > 0 && none_waiting {
                state.all_ready_on_refresh = false;
                events.push(LobbyEvent::AllPlayersReady);
            }
            events.push(state.slots_event());

            if refresh.initialize_mods {
                let freemod = state.freemod;
                state.set_mods(Vec::new(), freemod, events);
            }
        });

        tracing::debug!(lobby = self.id, players = refresh.statuses.len(), "Lobby settings refreshed");
        for waiter in refresh.waiters {
            let _ = waiter.send(Ok(()));
        }
    }

    pub(super) fn fail_refresh(&self, error: &ClientError) {
        let refresh = self.state().refresh.take();
        for waiter in refresh.into_iter().flat_map(|refresh| refresh.waiters) {
            let _ = waiter.send(Err(error.clone()));
        }
    }
}
