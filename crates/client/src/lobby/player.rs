use std::sync::Arc;

use bancho_domain::{Mod, PlayerState, Score, Team};

use crate::entities::User;

/// A user as seen by one lobby.
///
/// Created once per user and lobby; re-entering the lobby resets it.
#[derive(Debug, Clone)]
pub struct LobbyPlayer {
    pub user: Arc<User>,
    pub state: PlayerState,
    pub host: bool,
    pub team: Option<Team>,
    pub mods: Vec<Mod>,
    /// Score of the latest match
    pub score: Option<Score>,
}

impl LobbyPlayer {
    pub(crate) fn new(user: Arc<User>) -> Self {
        Self {
            user,
            state: PlayerState::NotReady,
            host: false,
            team: None,
            mods: Vec::new(),
            score: None,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = PlayerState::NotReady;
        self.host = false;
        self.team = None;
        self.mods.clear();
        self.score = None;
    }

    pub fn name(&self) -> &str {
        self.user.name()
    }
}
