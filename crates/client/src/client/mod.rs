//! The Bancho client: connection, dispatch and the outgoing pipeline.

mod dispatcher;
mod events;
mod outgoing;
mod session;

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use bancho_domain::{channel_key, multiplayer_channel_name, validate_channel_name};
use bancho_shared::parse_match_created;
use dashmap::DashMap;

use crate::config::ClientConfig;
use crate::entities::registry::{UserRegistry, WeakRegistry};
use crate::entities::{Channel, User, WhoisReply};
use crate::error::{ClientError, ClientResult};
use crate::infrastructure::messaging::{ConnectionState, EventBus, PendingRequests};
use crate::infrastructure::osu_api::OsuApi;
use crate::infrastructure::rate_limiter::RateLimiter;
use crate::ports::{StatsApi, UserLookup};

pub use events::ClientEvent;
pub use outgoing::Recipient;

use outgoing::OutgoingQueue;
use session::ConnectionCore;

/// Completions awaited by channel and user operations.
#[derive(Default)]
pub(crate) struct PendingTables {
    /// Keyed by channel key
    pub joins: PendingRequests<String, ClientResult<()>>,
    pub parts: PendingRequests<String, ClientResult<()>>,
    /// Keyed by user key
    pub whois: PendingRequests<String, ClientResult<WhoisReply>>,
}

pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) stats: Option<Arc<dyn StatsApi>>,
    pub(crate) users: UserRegistry,
    channels: WeakRegistry<String, Channel>,
    /// Channels this client is in, held strongly and re-joined on reconnect
    joined: DashMap<String, Arc<Channel>>,
    self_user: Arc<User>,
    bot_user: Arc<User>,
    pub(crate) events: EventBus<ClientEvent>,
    core: Mutex<ConnectionCore>,
    pending: Mutex<PendingTables>,
    /// WHOIS replies being assembled from 311/319 until 318
    whois_replies: DashMap<String, WhoisReply>,
    outgoing: OutgoingQueue,
    rate_limiter: RateLimiter,
    /// One `!stats` lookup in flight at a time
    pub(crate) stats_lookup: tokio::sync::Mutex<()>,
    me: Weak<ClientInner>,
}

impl ClientInner {
    fn core(&self) -> MutexGuard<'_, ConnectionCore> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn pending(&self) -> MutexGuard<'_, PendingTables> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get or create the user with this name.
    pub(crate) fn user(&self, name: &str) -> Arc<User> {
        self.users
            .get_or_create(name, || Arc::new(User::new(name, self.me.clone())))
    }

    /// Get or create a channel. Names coming from the gateway are trusted.
    pub(crate) fn channel(&self, name: &str) -> Arc<Channel> {
        if let Some(joined) = self.joined.get(&channel_key(name)) {
            return Arc::clone(joined.value());
        }
        let with_lobby = self.stats.is_some();
        self.channels.get_or_insert_with(channel_key(name), || {
            Channel::create(name, self.me.clone(), with_lobby)
        })
    }

    pub(crate) fn self_user(&self) -> Arc<User> {
        Arc::clone(&self.self_user)
    }

    pub(crate) fn bot_user(&self) -> Arc<User> {
        Arc::clone(&self.bot_user)
    }

    pub(crate) fn is_self(&self, user: &User) -> bool {
        user.key() == self.self_user.key()
    }

    pub(crate) fn is_bot(&self, user: &User) -> bool {
        user.key() == self.bot_user.key()
    }

    pub(crate) async fn user_by_id(&self, id: u64) -> ClientResult<Arc<User>> {
        if let Some(user) = self.users.by_id(id) {
            return Ok(user);
        }
        let stats = self.stats.clone().ok_or(ClientError::StatsUnavailable)?;
        let profile = stats
            .fetch_user(UserLookup::Id(id))
            .await?
            .ok_or_else(|| ClientError::UserNotFound(format!("#{id}")))?;

        let user = self.user(&profile.username);
        user.learn_id(profile.id);
        user.store_profile(profile);
        Ok(user)
    }

    /// Default sink for errors raised by background work.
    pub(crate) fn report_error(&self, error: ClientError) {
        tracing::warn!(error = %error, "Background operation failed");
        self.events.publish(ClientEvent::Error(error));
    }

    /// Forget session-scoped state after the connection ended: membership,
    /// outstanding joins/parts/WHOIS and lobby confirmations fail with `error`.
    fn reset_session(&self, error: &ClientError) {
        {
            let mut pending = self.pending();
            pending.joins.resolve_all(Err(error.clone()));
            pending.parts.resolve_all(Err(error.clone()));
            pending.whois.resolve_all(Err(error.clone()));
        }
        self.whois_replies.clear();

        let channels: Vec<Arc<Channel>> = self
            .joined
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for channel in &channels {
            channel.set_joined(false);
            channel.clear_members();
            if let Some(lobby) = channel.lobby() {
                lobby.on_connection_lost(error);
            }
        }
        if !self.config.auto_rejoin {
            self.joined.clear();
        }
    }
}

/// Handle to a Bancho connection.
///
/// Cloning yields another handle to the same client. Every background task
/// holds the client weakly; dropping the last handle stops it.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Create a client. With an API key configured, the statistics
    /// collaborator is the osu! API v1.
    pub fn new(config: ClientConfig) -> Self {
        let stats = config
            .api_key
            .as_deref()
            .map(|key| Arc::new(OsuApi::new(key)) as Arc<dyn StatsApi>);
        Self::build(config, stats)
    }

    /// Create a client with an injected statistics collaborator.
    pub fn with_stats(config: ClientConfig, stats: Arc<dyn StatsApi>) -> Self {
        Self::build(config, Some(stats))
    }

    fn build(config: ClientConfig, stats: Option<Arc<dyn StatsApi>>) -> Self {
        let inner = Arc::new_cyclic(|me: &Weak<ClientInner>| ClientInner {
            self_user: Arc::new(User::new(&config.username, me.clone())),
            bot_user: Arc::new(User::new(&config.bot_name, me.clone())),
            rate_limiter: RateLimiter::new(config.rate_limit),
            config,
            stats,
            users: UserRegistry::default(),
            channels: WeakRegistry::default(),
            joined: DashMap::new(),
            events: EventBus::new(),
            core: Mutex::new(ConnectionCore::default()),
            pending: Mutex::new(PendingTables::default()),
            whois_replies: DashMap::new(),
            outgoing: OutgoingQueue::new(),
            stats_lookup: tokio::sync::Mutex::new(()),
            me: me.clone(),
        });
        inner.users.insert(&inner.self_user);
        inner.users.insert(&inner.bot_user);
        Self { inner }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn events(&self) -> &EventBus<ClientEvent> {
        &self.inner.events
    }

    /// Connect and authenticate.
    ///
    /// Fails with `AlreadyConnected` when connected or connecting. Resolves
    /// on the welcome reply; an authentication failure is terminal, a
    /// transport failure enters the reconnect cycle and fails this call.
    pub async fn connect(&self) -> ClientResult<()> {
        self.inner.connect().await
    }

    /// Disconnect and disable auto-reconnect. Idempotent.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Get or create a user by name.
    pub fn user(&self, name: &str) -> Arc<User> {
        self.inner.user(name)
    }

    /// User resolved by id, through the registry first and then the
    /// statistics collaborator.
    pub async fn user_by_id(&self, id: u64) -> ClientResult<Arc<User>> {
        self.inner.user_by_id(id).await
    }

    /// The authenticated user.
    pub fn self_user(&self) -> Arc<User> {
        self.inner.self_user()
    }

    pub fn bot_user(&self) -> Arc<User> {
        self.inner.bot_user()
    }

    /// Get or create a channel by name.
    pub fn channel(&self, name: &str) -> ClientResult<Arc<Channel>> {
        validate_channel_name(name)?;
        Ok(self.inner.channel(name))
    }

    pub fn joined_channels(&self) -> Vec<Arc<Channel>> {
        self.inner
            .joined
            .iter()
            .filter(|entry| entry.value().is_joined())
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Create a tournament lobby through the bot and return its channel.
    ///
    /// Fails with `Timeout` after `lobby_creation_timeout`.
    pub async fn create_lobby(&self, name: &str) -> ClientResult<Arc<Channel>> {
        if self.inner.stats.is_none() {
            return Err(ClientError::StatsUnavailable);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::invalid_argument("lobby name cannot be empty"));
        }

        let bot = self.inner.bot_user();
        let mut replies = bot.events().subscribe_channel();
        let created = async {
            bot.send_message(format!("!mp make {name}")).await?;
            while let Some(message) = replies.recv().await {
                if message.self_sent {
                    continue;
                }
                if let Some((id, created_name)) = parse_match_created(&message.content) {
                    if created_name == name {
                        tracing::info!(lobby = id, name, "Lobby created");
                        return Ok(self.inner.channel(&multiplayer_channel_name(id)));
                    }
                }
            }
            Err(ClientError::ClientDropped)
        };

        tokio::time::timeout(self.inner.config.lobby_creation_timeout, created)
            .await
            .map_err(|_| ClientError::Timeout("lobby creation"))?
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Arc<ClientInner> {
        &self.inner
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.inner.config.username)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockStatsApi;

    fn client() -> Client {
        Client::new(ClientConfig::new("Test User", "pw"))
    }

    #[test]
    fn test_users_are_cached_case_insensitively() {
        let client = client();
        let a = client.user("Some Player");
        let b = client.user("some_player");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&client.user("TEST_USER"), &client.self_user()));
        assert!(client.self_user().is_self());
        assert!(!client.bot_user().is_self());
    }

    #[test]
    fn test_channel_names_are_validated() {
        let client = client();
        assert!(client.channel("#osu").is_ok());
        assert!(matches!(
            client.channel("osu"),
            Err(ClientError::Domain(_))
        ));
        assert!(client.channel("#os u").is_err());
    }

    #[test]
    fn test_lobby_requires_stats() {
        let client = client();
        assert!(client.channel("#mp_1").expect("valid").lobby().is_none());

        let with_stats = Client::with_stats(
            ClientConfig::new("me", "pw"),
            Arc::new(MockStatsApi::new()),
        );
        assert!(with_stats.channel("#mp_1").expect("valid").lobby().is_some());
    }

    #[tokio::test]
    async fn test_create_lobby_validates_before_io() {
        let client = client();
        assert!(matches!(
            client.create_lobby("x").await,
            Err(ClientError::StatsUnavailable)
        ));

        let with_stats = Client::with_stats(
            ClientConfig::new("me", "pw"),
            Arc::new(MockStatsApi::new()),
        );
        assert!(matches!(
            with_stats.create_lobby("   ").await,
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_user_by_id_uses_registry_then_stats() {
        let mut stats = MockStatsApi::new();
        stats
            .expect_fetch_user()
            .withf(|lookup| *lookup == UserLookup::Id(2))
            .times(1)
            .returning(|_| {
                Ok(Some(crate::ports::UserProfile {
                    id: 2,
                    username: "peppy".into(),
                    ..Default::default()
                }))
            });
        let client = Client::with_stats(ClientConfig::new("me", "pw"), Arc::new(stats));

        let first = client.user_by_id(2).await.expect("fetched");
        assert_eq!(first.name(), "peppy");
        assert_eq!(first.id(), Some(2));

        let second = client.user_by_id(2).await.expect("cached");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_send_before_connect_fails_disconnected() {
        let client = client();
        let result = client.user("peppy").send_message("hello").await;
        assert!(matches!(result, Err(ClientError::Disconnected)));
    }
}
