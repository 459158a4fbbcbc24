//! Users known to the client

use std::fmt;
use std::sync::{Arc, OnceLock, RwLock, Weak};

use bancho_domain::{normalize_user_name, user_key};
use bancho_shared::{parse_stats_reply, Command, StatsReply};
use serde::{Deserialize, Serialize};

use crate::client::{ClientInner, Recipient};
use crate::error::{ClientError, ClientResult};
use crate::infrastructure::messaging::EventBus;
use crate::ports::{UserLookup, UserProfile};

use super::Message;

/// Result of a WHOIS query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisReply {
    pub name: String,
    pub user_id: Option<u64>,
    pub channels: Vec<String>,
}

impl WhoisReply {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_id: None,
            channels: Vec::new(),
        }
    }
}

/// Answer of the bot's `!stats` command
#[derive(Debug, Clone)]
pub struct BotStats {
    pub user: Arc<User>,
    /// In-game status, `None` when offline
    pub status: Option<String>,
    pub online: bool,
    pub level: Option<u32>,
    pub accuracy: Option<f64>,
    pub ranked_score: Option<u64>,
    pub rank: Option<u32>,
    pub playcount: Option<u32>,
}

impl BotStats {
    fn new(user: Arc<User>) -> Self {
        Self {
            user,
            status: None,
            online: false,
            level: None,
            accuracy: None,
            ranked_score: None,
            rank: None,
            playcount: None,
        }
    }
}

/// A user identified by its IRC name.
///
/// The numeric id is immutable once learned (from WHOIS, `!stats`, the
/// statistics API or a lobby listing).
pub struct User {
    name: String,
    key: String,
    id: OnceLock<u64>,
    profile: RwLock<Option<UserProfile>>,
    events: EventBus<Message>,
    client: Weak<ClientInner>,
}

impl User {
    pub(crate) fn new(name: &str, client: Weak<ClientInner>) -> Self {
        let name = normalize_user_name(name);
        Self {
            key: name.to_lowercase(),
            name,
            id: OnceLock::new(),
            profile: RwLock::new(None),
            events: EventBus::new(),
            client,
        }
    }

    /// IRC name: spaces replaced by underscores.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> Option<u64> {
        self.id.get().copied()
    }

    /// Profile fetched with [`User::fetch_profile`], if any.
    pub fn profile(&self) -> Option<UserProfile> {
        self.profile
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Private messages exchanged with this user.
    pub fn events(&self) -> &EventBus<Message> {
        &self.events
    }

    pub fn is_self(&self) -> bool {
        self.client
            .upgrade()
            .is_some_and(|client| user_key(&client.config.username) == self.key)
    }

    pub(crate) fn learn_id(self: &Arc<Self>, id: u64) {
        if let Err(rejected) = self.id.set(id) {
            if self.id() != Some(rejected) {
                tracing::warn!(user = %self.name, known = ?self.id(), rejected, "Conflicting user id ignored");
            }
            return;
        }
        if let Some(client) = self.client.upgrade() {
            client.users.index_id(id, self);
        }
    }

    fn client(&self) -> ClientResult<Arc<ClientInner>> {
        self.client.upgrade().ok_or(ClientError::ClientDropped)
    }

    /// Queue a private message to this user; resolves once it is on the wire.
    pub async fn send_message(self: &Arc<Self>, body: impl Into<String>) -> ClientResult<()> {
        self.client()?
            .submit(Recipient::User(Arc::clone(self)), body.into())
            .await
    }

    /// Query WHOIS. Concurrent calls for the same user share one request.
    pub async fn whois(self: &Arc<Self>) -> ClientResult<WhoisReply> {
        let client = self.client()?;
        let (rx, first) = {
            let mut pending = client.pending();
            let first = !pending.whois.contains(&self.key);
            (pending.whois.register(self.key.clone()), first)
        };
        if first {
            if let Err(err) = client.write_command(Command::Whois(self.name.clone())) {
                client.pending().whois.resolve(&self.key, Err(err));
            }
        }

        let reply = rx.await.map_err(|_| ClientError::ClientDropped)??;
        if let Some(id) = reply.user_id {
            self.learn_id(id);
        }
        Ok(reply)
    }

    /// Fetch the full profile through the statistics collaborator.
    pub async fn fetch_profile(self: &Arc<Self>) -> ClientResult<UserProfile> {
        let client = self.client()?;
        let stats = client.stats.clone().ok_or(ClientError::StatsUnavailable)?;
        let profile = stats
            .fetch_user(UserLookup::Name(self.name.clone()))
            .await?
            .ok_or_else(|| ClientError::UserNotFound(self.name.clone()))?;

        self.learn_id(profile.id);
        self.store_profile(profile.clone());
        Ok(profile)
    }

    pub(crate) fn store_profile(&self, profile: UserProfile) {
        *self
            .profile
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(profile);
    }

    /// Ask the bot for `!stats` of this user.
    pub async fn stats(self: &Arc<Self>) -> ClientResult<BotStats> {
        let client = self.client()?;
        // "User not found" carries no name, so answers are told apart by order
        let _turn = client.stats_lookup.lock().await;
        let bot = client.bot_user();
        let mut replies = bot.events().subscribe_channel();
        let request = format!("!stats {}", self.name);
        bot.send_message(request.clone()).await?;

        let mut stats = BotStats::new(Arc::clone(self));
        let mut requested = false;
        // Only lines following our own header belong to this answer
        let mut collecting = false;
        while let Some(message) = replies.recv().await {
            if message.self_sent {
                requested |= message.content == request;
                continue;
            }
            if !requested {
                continue;
            }
            match parse_stats_reply(&message.content) {
                Some(StatsReply::UserNotFound) => {
                    return Err(ClientError::UserNotFound(self.name.clone()));
                }
                Some(StatsReply::Header {
                    username,
                    user_id,
                    status,
                }) => {
                    collecting = user_key(&username) == self.key;
                    if collecting {
                        self.learn_id(user_id);
                        stats.online = status.is_some();
                        stats.status = status;
                    }
                }
                Some(StatsReply::Score { ranked_score, rank }) if collecting => {
                    stats.ranked_score = Some(ranked_score);
                    stats.rank = Some(rank);
                }
                Some(StatsReply::Plays { playcount, level }) if collecting => {
                    stats.playcount = Some(playcount);
                    stats.level = Some(level);
                }
                Some(StatsReply::Accuracy(accuracy)) if collecting => {
                    stats.accuracy = Some(accuracy);
                    return Ok(stats);
                }
                _ => {}
            }
        }
        Err(ClientError::ClientDropped)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("name", &self.name)
            .field("id", &self.id())
            .finish()
    }
}
