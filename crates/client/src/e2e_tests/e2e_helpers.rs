//! Fake gateway, fake statistics collaborator and event helpers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bancho_domain::{user_key, GameMode};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::ports::{Beatmap, MatchInfo, StatsApi, StatsError, UserLookup, UserProfile};
use crate::{Client, ClientConfig, RateLimitConfig};

pub const TEST_NICK: &str = "tester";
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Fake gateway
// =============================================================================

pub struct FakeGateway {
    listener: TcpListener,
    port: u16,
}

impl FakeGateway {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        Self { listener, port }
    }

    /// Fast retries and a flood budget that never throttles a test.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(TEST_NICK, "secret")
            .with_server("127.0.0.1", self.port)
            .with_reconnect_delay(Duration::from_millis(50))
            .with_lobby_creation_timeout(Duration::from_secs(2))
            .with_rate_limit(RateLimitConfig {
                window: Duration::from_secs(1),
                private_limit: 100,
                public_limit: Some(100),
            })
    }

    pub async fn accept(&self) -> GatewaySession {
        let (stream, _) = tokio::time::timeout(STEP_TIMEOUT, self.listener.accept())
            .await
            .expect("client connected in time")
            .expect("accept");
        let (reader, writer) = stream.into_split();
        GatewaySession {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    /// Whether the client opens a connection within `wait`.
    pub async fn connection_attempted(&self, wait: Duration) -> bool {
        tokio::time::timeout(wait, self.listener.accept()).await.is_ok()
    }
}

pub struct GatewaySession {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl GatewaySession {
    pub async fn next_line(&mut self) -> String {
        tokio::time::timeout(STEP_TIMEOUT, self.lines.next_line())
            .await
            .expect("line arrived in time")
            .expect("read line")
            .expect("connection open")
    }

    /// Skip lines until one starts with `prefix`.
    pub async fn expect_line(&mut self, prefix: &str) -> String {
        loop {
            let line = self.next_line().await;
            if line.starts_with(prefix) {
                return line;
            }
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("write line");
    }

    /// Read the three authentication lines, then answer with `reply`.
    pub async fn handshake(&mut self, reply: &str) {
        assert_eq!(self.next_line().await, "PASS secret");
        assert!(self.next_line().await.starts_with(&format!("USER {TEST_NICK}")));
        assert_eq!(self.next_line().await, format!("NICK {TEST_NICK}"));
        self.send(reply).await;
    }

    pub async fn welcome(&mut self) {
        self.handshake(&format!(":cho.ppy.sh 001 {TEST_NICK} :Welcome to the osu!Bancho."))
            .await;
    }

    pub async fn confirm_join(&mut self, channel: &str) {
        self.expect_line(&format!("JOIN {channel}")).await;
        self.send(&format!(":{TEST_NICK}!cho@ppy.sh JOIN :{channel}"))
            .await;
    }

    pub async fn bot_says(&mut self, channel: &str, text: &str) {
        self.send(&format!(":BanchoBot!cho@ppy.sh PRIVMSG {channel} :{text}"))
            .await;
    }
}

/// Connect `client` through `gateway` and complete the handshake.
pub async fn connect(client: &Client, gateway: &FakeGateway) -> GatewaySession {
    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });
    let mut session = gateway.accept().await;
    session.welcome().await;
    connecting
        .await
        .expect("connect task")
        .expect("connected");
    session
}

// =============================================================================
// Event helpers
// =============================================================================

/// Receive until `matches` accepts an event.
pub async fn wait_for<E>(rx: &mut mpsc::UnboundedReceiver<E>, mut matches: impl FnMut(&E) -> bool) -> E {
    tokio::time::timeout(STEP_TIMEOUT, async {
        loop {
            let event = rx.recv().await.expect("bus open");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event arrived in time")
}

// =============================================================================
// Fake statistics collaborator
// =============================================================================

#[derive(Default)]
pub struct FakeStats {
    users: HashMap<String, (UserProfile, Duration)>,
    beatmaps: HashMap<u64, Beatmap>,
}

impl FakeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user whose lookup completes after `delay`.
    pub fn with_user(mut self, id: u64, name: &str, delay: Duration) -> Self {
        let profile = UserProfile {
            id,
            username: name.to_string(),
            ..UserProfile::default()
        };
        self.users.insert(user_key(name), (profile, delay));
        self
    }

    pub fn with_beatmap(mut self, id: u64, artist: &str, title: &str) -> Self {
        self.beatmaps.insert(
            id,
            Beatmap {
                id,
                beatmapset_id: id,
                artist: artist.to_string(),
                title: title.to_string(),
                version: "Normal".to_string(),
                creator: "peppy".to_string(),
                mode: GameMode::Osu,
                difficulty_rating: 2.5,
                bpm: 120.0,
                total_length: 90,
            },
        );
        self
    }

    pub fn into_arc(self) -> Arc<dyn StatsApi> {
        Arc::new(self)
    }
}

#[async_trait]
impl StatsApi for FakeStats {
    async fn fetch_user(&self, lookup: UserLookup) -> Result<Option<UserProfile>, StatsError> {
        let found = match lookup {
            UserLookup::Name(name) => self.users.get(&user_key(&name)).cloned(),
            UserLookup::Id(id) => self
                .users
                .values()
                .find(|(profile, _)| profile.id == id)
                .cloned(),
        };
        let Some((profile, delay)) = found else {
            return Ok(None);
        };
        tokio::time::sleep(delay).await;
        Ok(Some(profile))
    }

    async fn fetch_beatmap(&self, id: u64) -> Result<Option<Beatmap>, StatsError> {
        Ok(self.beatmaps.get(&id).cloned())
    }

    async fn fetch_match(&self, id: u64) -> Result<Option<MatchInfo>, StatsError> {
        Ok(Some(MatchInfo {
            id,
            name: "test lobby".to_string(),
            start_time: None,
            end_time: None,
            games: 0,
        }))
    }
}
