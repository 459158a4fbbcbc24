//! `!mp` commands and state reads

use bancho_domain::{
    to_bit_flags, user_key, validate_size, validate_slot, GameMode, Mod, Score, Team, TeamMode,
    WinCondition,
};
use rand::Rng;

use crate::error::{ClientError, ClientResult};
use crate::ports::{Beatmap, MatchInfo};

use super::state::SettingsRefresh;
use super::{Confirmation, Lobby, LobbyPlayer, Slots};

/// Random suffix that keeps identical consecutive commands distinct.
fn nonce() -> String {
    let mut rng = rand::thread_rng();
    let mut nonce = String::with_capacity(8);
    nonce.push(rng.gen_range(b'a'..=b'z') as char);
    for _ in 0..7 {
        nonce.push(char::from_digit(rng.gen_range(0..36), 36).unwrap_or('0'));
    }
    nonce
}

impl Lobby {
    async fn send(&self, command: String) -> ClientResult<()> {
        let channel = self.channel.upgrade().ok_or(ClientError::ClientDropped)?;
        channel.send_message(command).await
    }

    /// Send `command` and wait for the reply resolving `key`.
    async fn request(&self, key: Confirmation, command: String) -> ClientResult<()> {
        let rx = self.confirmations().register(key.clone());
        if let Err(err) = self.send(command).await {
            self.confirm(&key, Err(err));
        }
        rx.await.map_err(|_| ClientError::ClientDropped)?
    }

    // =========================================================================
    // Confirmed operations
    // =========================================================================

    /// Select a beatmap, in `mode` or the lobby's current game mode.
    pub async fn set_map(&self, beatmap_id: u64, mode: Option<GameMode>) -> ClientResult<()> {
        let mode = mode.unwrap_or_else(|| self.state().gamemode);
        self.request(
            Confirmation::Map,
            format!("!mp map {beatmap_id} {} {}", mode.as_number(), nonce()),
        )
        .await?;
        self.update(|state, events| state.set_gamemode(mode, events));
        Ok(())
    }

    pub async fn set_mods(&self, mods: &[Mod], freemod: bool) -> ClientResult<()> {
        let freemod = if freemod { " freemod" } else { "" };
        self.request(
            Confirmation::Mods,
            format!("!mp mods {}{freemod} {}", to_bit_flags(mods), nonce()),
        )
        .await
    }

    pub async fn set_name(&self, name: &str) -> ClientResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::invalid_argument("lobby name must not be empty"));
        }
        self.request(Confirmation::Name(name.to_string()), format!("!mp name {name}"))
            .await
    }

    /// An empty password removes it.
    pub async fn set_password(&self, password: &str) -> ClientResult<()> {
        self.request(Confirmation::Password, format!("!mp password {password}"))
            .await
    }

    pub async fn lock_slots(&self) -> ClientResult<()> {
        self.request(Confirmation::Lock, format!("!mp lock {}", nonce()))
            .await
    }

    pub async fn unlock_slots(&self) -> ClientResult<()> {
        self.request(Confirmation::Unlock, format!("!mp unlock {}", nonce()))
            .await
    }

    pub async fn set_size(&self, size: u32) -> ClientResult<()> {
        let size = validate_size(size)?;
        self.request(Confirmation::Size(size), format!("!mp size {size} {}", nonce()))
            .await
    }

    pub async fn set_settings(
        &self,
        team_mode: TeamMode,
        win_condition: WinCondition,
        size: Option<u32>,
    ) -> ClientResult<()> {
        let size = size.map(validate_size).transpose()?;
        let mut command = format!(
            "!mp set {} {}",
            team_mode.as_number(),
            win_condition.as_number()
        );
        if let Some(size) = size {
            command.push_str(&format!(" {size}"));
        }
        command.push_str(&format!(" {}", nonce()));

        self.request(
            Confirmation::Settings {
                team_mode,
                win_condition: Some(win_condition),
                size,
            },
            command,
        )
        .await
    }

    pub async fn clear_host(&self) -> ClientResult<()> {
        self.request(Confirmation::ClearHost, format!("!mp clearhost {}", nonce()))
            .await
    }

    /// Resolves once this client has left the room.
    pub async fn close_lobby(&self) -> ClientResult<()> {
        self.request(Confirmation::Close, format!("!mp close {}", nonce()))
            .await
    }

    /// Start now, or after `timer` seconds. A timed start resolves once sent.
    pub async fn start_match(&self, timer: Option<u32>) -> ClientResult<()> {
        match timer.filter(|seconds| *seconds > 0) {
            Some(seconds) => self.send(format!("!mp start {seconds} {}", nonce())).await,
            None => {
                self.request(Confirmation::Start, format!("!mp start {}", nonce()))
                    .await
            }
        }
    }

    pub async fn abort_match(&self) -> ClientResult<()> {
        self.request(Confirmation::Abort, format!("!mp abort {}", nonce()))
            .await
    }

    // =========================================================================
    // Operations resolved on send
    // =========================================================================

    pub async fn add_refs<S: AsRef<str>>(&self, names: &[S]) -> ClientResult<()> {
        self.send(format!("!mp addref {}", join_names(names)?)).await
    }

    pub async fn remove_refs<S: AsRef<str>>(&self, names: &[S]) -> ClientResult<()> {
        self.send(format!("!mp removeref {}", join_names(names)?)).await
    }

    /// Move a player to a 0-based slot.
    pub async fn move_player(&self, player: &LobbyPlayer, slot: usize) -> ClientResult<()> {
        let slot = validate_slot(slot)?;
        let id = player_id(player)?;
        self.send(format!("!mp move #{id} {}", slot + 1)).await
    }

    pub async fn change_team(&self, player: &LobbyPlayer, team: Team) -> ClientResult<()> {
        let id = player_id(player)?;
        self.send(format!("!mp team #{id} {team}")).await
    }

    pub async fn invite_player(&self, name: &str) -> ClientResult<()> {
        self.send(format!("!mp invite {name}")).await
    }

    pub async fn set_host(&self, name: &str) -> ClientResult<()> {
        self.send(format!("!mp host {name}")).await
    }

    pub async fn kick_player(&self, name: &str) -> ClientResult<()> {
        self.send(format!("!mp kick {name}")).await
    }

    pub async fn ban_player(&self, name: &str) -> ClientResult<()> {
        self.send(format!("!mp ban {name}")).await
    }

    pub async fn start_timer(&self, seconds: u32) -> ClientResult<()> {
        self.send(format!("!mp timer {seconds} {}", nonce())).await
    }

    pub async fn abort_timer(&self) -> ClientResult<()> {
        self.send(format!("!mp aborttimer {}", nonce())).await
    }

    /// Refresh name, map, mode, mods and every slot from `!mp settings`.
    ///
    /// Concurrent calls share a single round trip.
    pub async fn update_settings(&self) -> ClientResult<()> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let first = {
            let mut state = self.state();
            let first = state.refresh.is_none();
            state
                .refresh
                .get_or_insert_with(SettingsRefresh::default)
                .waiters
                .push(tx);
            first
        };
        if first {
            if let Err(err) = self.send(format!("!mp settings {}", nonce())).await {
                self.fail_refresh(&err);
            }
        }
        rx.await.map_err(|_| ClientError::ClientDropped)?
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    pub fn beatmap_id(&self) -> Option<u64> {
        self.state().beatmap_id
    }

    pub fn beatmap(&self) -> Option<Beatmap> {
        self.state().beatmap.clone()
    }

    pub fn team_mode(&self) -> Option<TeamMode> {
        self.state().team_mode
    }

    pub fn win_condition(&self) -> Option<WinCondition> {
        self.state().win_condition
    }

    pub fn mods(&self) -> Vec<Mod> {
        self.state().mods.clone()
    }

    pub fn freemod(&self) -> bool {
        self.state().freemod
    }

    pub fn playing(&self) -> bool {
        self.state().playing
    }

    pub fn size(&self) -> u8 {
        self.state().size
    }

    pub fn gamemode(&self) -> GameMode {
        self.state().gamemode
    }

    /// Scores of the latest match, sorted once it finished.
    pub fn scores(&self) -> Vec<Score> {
        self.state().scores.clone()
    }

    pub fn slots(&self) -> Slots {
        self.state().slot_snapshot()
    }

    pub fn host(&self) -> Option<LobbyPlayer> {
        let state = self.state();
        state.host_key().and_then(|key| state.player(&key))
    }

    /// Seated player named `name`.
    pub fn player_by_name(&self, name: &str) -> Option<LobbyPlayer> {
        let key = user_key(name);
        let state = self.state();
        state.slot_of(&key).and_then(|_| state.player(&key))
    }

    /// 0-based slot of the named player.
    pub fn player_slot(&self, name: &str) -> Option<usize> {
        self.state().slot_of(&user_key(name))
    }

    pub fn history_url(&self) -> String {
        format!("https://osu.ppy.sh/community/matches/{}", self.id)
    }

    /// Match record from the statistics collaborator.
    pub async fn fetch_from_api(&self) -> ClientResult<Option<MatchInfo>> {
        let stats = self
            .client()?
            .stats
            .clone()
            .ok_or(ClientError::StatsUnavailable)?;
        Ok(stats.fetch_match(self.id).await?)
    }
}

fn join_names<S: AsRef<str>>(names: &[S]) -> ClientResult<String> {
    if names.is_empty() {
        return Err(ClientError::invalid_argument("at least one name is required"));
    }
    Ok(names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", "))
}

fn player_id(player: &LobbyPlayer) -> ClientResult<u64> {
    player.user.id().ok_or_else(|| {
        ClientError::invalid_argument(format!("id of {} is not known yet", player.name()))
    })
}
