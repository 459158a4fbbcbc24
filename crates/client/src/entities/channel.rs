//! Channels and their membership

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use bancho_domain::{channel_key, multiplayer_id, user_key};
use bancho_shared::Command;
use dashmap::DashMap;

use crate::client::{ClientInner, Recipient};
use crate::error::{ClientError, ClientResult};
use crate::infrastructure::messaging::EventBus;
use crate::lobby::Lobby;

use super::{Message, User};

/// Channel privilege of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberMode {
    #[default]
    Regular,
    /// `+v`
    Voice,
    /// `+o`, IRC operator / moderator
    Operator,
}

impl MemberMode {
    /// Split a NAMES entry (`@peppy`, `+someone`) into mode and name.
    pub(crate) fn split_prefix(entry: &str) -> (MemberMode, &str) {
        if let Some(name) = entry.strip_prefix('@') {
            (MemberMode::Operator, name)
        } else if let Some(name) = entry.strip_prefix('+') {
            (MemberMode::Voice, name)
        } else {
            (MemberMode::Regular, entry)
        }
    }

    /// Mode granted by a MODE flag letter.
    pub(crate) fn from_flag(flag: char) -> Option<MemberMode> {
        match flag {
            'o' => Some(MemberMode::Operator),
            'v' => Some(MemberMode::Voice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChannelMember {
    pub user: Arc<User>,
    pub mode: MemberMode,
}

/// Notifications published on a channel's bus.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Message(Message),
    Join(Arc<User>),
    Part(Arc<User>),
}

pub struct Channel {
    name: String,
    key: String,
    topic: RwLock<String>,
    members: DashMap<String, ChannelMember>,
    joined: AtomicBool,
    events: EventBus<ChannelEvent>,
    lobby: Option<Arc<Lobby>>,
    client: Weak<ClientInner>,
}

impl Channel {
    /// Build a channel; `#mp_<id>` channels get a lobby when `with_lobby` is set.
    pub(crate) fn create(name: &str, client: Weak<ClientInner>, with_lobby: bool) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Channel>| {
            let lobby = multiplayer_id(name)
                .filter(|_| with_lobby)
                .map(|id| Lobby::new(id, name, weak.clone(), client.clone()));
            Self {
                name: name.to_string(),
                key: channel_key(name),
                topic: RwLock::new(String::new()),
                members: DashMap::new(),
                joined: AtomicBool::new(false),
                events: EventBus::new(),
                lobby,
                client,
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub fn topic(&self) -> String {
        self.topic
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_joined(&self) -> bool {
        self.joined.load(Ordering::SeqCst)
    }

    pub fn is_multiplayer(&self) -> bool {
        multiplayer_id(&self.name).is_some()
    }

    /// Lobby of a multiplayer channel. `None` for regular channels and
    /// when no statistics collaborator is configured.
    pub fn lobby(&self) -> Option<Arc<Lobby>> {
        self.lobby.clone()
    }

    pub fn events(&self) -> &EventBus<ChannelEvent> {
        &self.events
    }

    pub fn members(&self) -> Vec<ChannelMember> {
        self.members.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn member(&self, name: &str) -> Option<ChannelMember> {
        self.members
            .get(&user_key(name))
            .map(|entry| entry.value().clone())
    }

    // =========================================================================
    // Bookkeeping driven by the dispatcher
    // =========================================================================

    pub(crate) fn set_topic(&self, topic: &str) {
        *self
            .topic
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = topic.to_string();
    }

    pub(crate) fn set_joined(&self, joined: bool) {
        self.joined.store(joined, Ordering::SeqCst);
    }

    /// Add a member or update the mode of an existing one.
    pub(crate) fn upsert_member(&self, user: Arc<User>, mode: MemberMode) {
        self.members
            .entry(user.key().to_string())
            .and_modify(|member| member.mode = mode)
            .or_insert(ChannelMember { user, mode });
    }

    /// Add a member, keeping the mode of an existing entry.
    pub(crate) fn add_member(&self, user: Arc<User>) {
        self.members
            .entry(user.key().to_string())
            .or_insert(ChannelMember {
                user,
                mode: MemberMode::Regular,
            });
    }

    pub(crate) fn remove_member(&self, user: &User) -> bool {
        self.members.remove(user.key()).is_some()
    }

    pub(crate) fn clear_members(&self) {
        self.members.clear();
    }

    // =========================================================================
    // Operations
    // =========================================================================

    fn client(&self) -> ClientResult<Arc<ClientInner>> {
        self.client.upgrade().ok_or(ClientError::ClientDropped)
    }

    /// Queue a message to this channel; resolves once it is on the wire.
    pub async fn send_message(self: &Arc<Self>, body: impl Into<String>) -> ClientResult<()> {
        self.client()?
            .submit(Recipient::Channel(Arc::clone(self)), body.into())
            .await
    }

    /// Join the channel. Fails with `ChannelNotFound` when the gateway does
    /// not know it.
    pub async fn join(self: &Arc<Self>) -> ClientResult<()> {
        if self.is_joined() {
            return Ok(());
        }
        let client = self.client()?;
        let rx = client.pending().joins.register(self.key.clone());
        if let Err(err) = client.write_command(Command::Join(self.name.clone())) {
            client.pending().joins.resolve(&self.key, Err(err));
        }
        rx.await.map_err(|_| ClientError::ClientDropped)?
    }

    pub async fn leave(self: &Arc<Self>) -> ClientResult<()> {
        let client = self.client()?;
        let rx = client.pending().parts.register(self.key.clone());
        if let Err(err) = client.write_command(Command::Part(self.name.clone())) {
            client.pending().parts.resolve(&self.key, Err(err));
        }
        rx.await.map_err(|_| ClientError::ClientDropped)?
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("joined", &self.is_joined())
            .field("members", &self.members.len())
            .finish()
    }
}
