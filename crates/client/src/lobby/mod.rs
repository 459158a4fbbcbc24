//! Multiplayer lobby synchronizer
//!
//! A lobby mirrors the state of a `#mp_<id>` room from the bot's replies in
//! that channel. Operations send one `!mp` command and resolve when the
//! confirming reply is observed.
//!
//! Two serial queues keep asynchronous work in arrival order:
//! - the slot queue gates every update that touches the slot array
//! - the player queue gates creation of players that need a lookup

mod events;
mod handlers;
mod operations;
mod player;
mod queue;
mod state;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use bancho_domain::{TeamMode, WinCondition};

use crate::client::ClientInner;
use crate::entities::Channel;
use crate::error::{ClientError, ClientResult};
use crate::infrastructure::messaging::{EventBus, PendingRequests};

pub use events::{LobbyEvent, Slots};
pub use player::LobbyPlayer;

use queue::SerialQueue;
use state::LobbyState;

/// Correlation key of an operation awaiting its confirming reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Confirmation {
    Map,
    Mods,
    Name(String),
    Password,
    Lock,
    Unlock,
    Size(u8),
    Settings {
        team_mode: TeamMode,
        win_condition: Option<WinCondition>,
        size: Option<u8>,
    },
    ClearHost,
    Start,
    Abort,
    Close,
}

pub struct Lobby {
    id: u64,
    channel: Weak<Channel>,
    client: Weak<ClientInner>,
    state: Mutex<LobbyState>,
    events: EventBus<LobbyEvent>,
    confirmations: Mutex<PendingRequests<Confirmation, ClientResult<()>>>,
    slot_queue: SerialQueue,
    player_queue: SerialQueue,
    me: Weak<Lobby>,
}

impl Lobby {
    pub(crate) fn new(
        id: u64,
        name: &str,
        channel: Weak<Channel>,
        client: Weak<ClientInner>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id,
            channel,
            client,
            state: Mutex::new(LobbyState::new(name)),
            events: EventBus::new(),
            confirmations: Mutex::new(PendingRequests::default()),
            slot_queue: SerialQueue::new("lobby-slots"),
            player_queue: SerialQueue::new("lobby-players"),
            me: me.clone(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn events(&self) -> &EventBus<LobbyEvent> {
        &self.events
    }

    /// Channel backing this lobby, while it is alive.
    pub fn channel(&self) -> Option<Arc<Channel>> {
        self.channel.upgrade()
    }

    fn state(&self) -> MutexGuard<'_, LobbyState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn confirmations(&self) -> MutexGuard<'_, PendingRequests<Confirmation, ClientResult<()>>> {
        self.confirmations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn client(&self) -> ClientResult<Arc<ClientInner>> {
        self.client.upgrade().ok_or(ClientError::ClientDropped)
    }

    /// Mutate the state, then publish the events recorded by `apply`.
    fn update<R>(&self, apply: impl FnOnce(&mut LobbyState, &mut Vec<LobbyEvent>) -> R) -> R {
        let mut events = Vec::new();
        let result = {
            let mut state = self.state();
            apply(&mut state, &mut events)
        };
        for event in events {
            self.events.publish(event);
        }
        result
    }

    fn emit(&self, event: LobbyEvent) {
        self.events.publish(event);
    }

    fn confirm(&self, key: &Confirmation, result: ClientResult<()>) {
        self.confirmations().resolve(key, result);
    }

    fn report(&self, error: ClientError) {
        match self.client.upgrade() {
            Some(client) => client.report_error(error),
            None => tracing::warn!(lobby = self.id, error = %error, "Lobby update failed"),
        }
    }

    // =========================================================================
    // Channel lifecycle
    // =========================================================================

    /// This client joined the channel: fetch the full lobby state.
    pub(crate) fn on_self_join(&self) {
        let Some(lobby) = self.me.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(err) = lobby.update_settings().await {
                lobby.report(err);
            }
        });
    }

    pub(crate) fn on_self_part(&self) {
        self.confirm(&Confirmation::Close, Ok(()));
    }

    pub(crate) fn on_connection_lost(&self, error: &ClientError) {
        self.confirmations().resolve_all(Err(error.clone()));
        self.fail_refresh(error);
    }
}

impl fmt::Debug for Lobby {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Lobby")
            .field("id", &self.id)
            .field("name", &state.name)
            .field("beatmap_id", &state.beatmap_id)
            .field("playing", &state.playing)
            .finish()
    }
}
