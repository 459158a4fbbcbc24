//! Client configuration.

use std::fmt;
use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_HOST: &str = "irc.ppy.sh";
pub const DEFAULT_PORT: u16 = 6667;
pub const DEFAULT_BOT_NAME: &str = "BanchoBot";

/// Flood policy of the outgoing pipeline.
///
/// `private_limit` messages per `window` is the authoritative budget for every
/// message. `public_limit`, when set, additionally throttles messages to public
/// channels (multiplayer channels are exempt).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub private_limit: usize,
    pub public_limit: Option<usize>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(6000),
            private_limit: 4,
            public_limit: Some(3),
        }
    }
}

impl RateLimitConfig {
    /// Profile for accounts granted bot status.
    pub fn bot_account() -> Self {
        Self {
            window: Duration::from_secs(60),
            private_limit: 270,
            public_limit: Some(54),
        }
    }
}

#[derive(Clone)]
pub struct ClientConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Key for the statistics API; enables lobbies and beatmap enrichment
    pub api_key: Option<String>,
    pub reconnect: bool,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
    /// Socket idle time after which the connection is considered dead
    pub idle_timeout: Duration,
    pub rate_limit: RateLimitConfig,
    /// Account whose replies drive lobby state
    pub bot_name: String,
    pub lobby_creation_timeout: Duration,
    /// Re-join previously joined channels after a reconnect
    pub auto_rejoin: bool,
}

impl ClientConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_key: None,
            reconnect: true,
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(60),
            rate_limit: RateLimitConfig::default(),
            bot_name: DEFAULT_BOT_NAME.to_string(),
            lobby_creation_timeout: Duration::from_secs(10),
            auto_rejoin: true,
        }
    }

    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_lobby_creation_timeout(mut self, timeout: Duration) -> Self {
        self.lobby_creation_timeout = timeout;
        self
    }

    pub fn with_auto_rejoin(mut self, auto_rejoin: bool) -> Self {
        self.auto_rejoin = auto_rejoin;
        self
    }

    /// Build the configuration from environment variables.
    ///
    /// `BANCHO_USERNAME` and `BANCHO_PASSWORD` are required; `BANCHO_HOST`,
    /// `BANCHO_PORT`, `OSU_API_KEY`, `BANCHO_RATE_WINDOW_MS`,
    /// `BANCHO_RATE_PRIVATE` and `BANCHO_RATE_PUBLIC` are optional.
    pub fn from_env() -> Result<Self, ClientError> {
        let username = std::env::var("BANCHO_USERNAME")
            .map_err(|_| ClientError::invalid_argument("BANCHO_USERNAME is not set"))?;
        let password = std::env::var("BANCHO_PASSWORD")
            .map_err(|_| ClientError::invalid_argument("BANCHO_PASSWORD is not set"))?;

        let mut config = Self::new(username, password);
        config.host = std::env::var("BANCHO_HOST").unwrap_or_else(|_| DEFAULT_HOST.into());
        config.port = env_parse("BANCHO_PORT").unwrap_or(DEFAULT_PORT);
        config.api_key = std::env::var("OSU_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let defaults = RateLimitConfig::default();
        config.rate_limit = RateLimitConfig {
            window: env_parse("BANCHO_RATE_WINDOW_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.window),
            private_limit: env_parse("BANCHO_RATE_PRIVATE").unwrap_or(defaults.private_limit),
            public_limit: match std::env::var("BANCHO_RATE_PUBLIC") {
                Ok(value) if value.trim() == "0" || value.trim().eq_ignore_ascii_case("off") => {
                    None
                }
                Ok(value) => value.trim().parse().ok().or(defaults.public_limit),
                Err(_) => defaults.public_limit,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that can never authenticate.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.username.trim().is_empty() {
            return Err(ClientError::invalid_argument("username cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(ClientError::invalid_argument("password cannot be empty"));
        }
        if self.rate_limit.private_limit == 0 {
            return Err(ClientError::invalid_argument(
                "private rate limit must allow at least one message",
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("reconnect", &self.reconnect)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("connect_timeout", &self.connect_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("rate_limit", &self.rate_limit)
            .field("bot_name", &self.bot_name)
            .field("lobby_creation_timeout", &self.lobby_creation_timeout)
            .field("auto_rejoin", &self.auto_rejoin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("me", "pw");
        assert_eq!(config.host, "irc.ppy.sh");
        assert_eq!(config.port, 6667);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.rate_limit.window, Duration::from_millis(6000));
        assert_eq!(config.rate_limit.private_limit, 4);
        assert_eq!(config.rate_limit.public_limit, Some(3));
        assert_eq!(config.bot_name, "BanchoBot");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ClientConfig::new("me", "hunter2").with_api_key("abcdef");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("abcdef"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_validate_rejects_empty_credentials() {
        assert!(ClientConfig::new("", "pw").validate().is_err());
        assert!(ClientConfig::new("me", "").validate().is_err());
        assert!(ClientConfig::new("me", "pw").validate().is_ok());
    }

    #[test]
    fn test_bot_account_profile() {
        let profile = RateLimitConfig::bot_account();
        assert_eq!(profile.window, Duration::from_secs(60));
        assert_eq!(profile.private_limit, 270);
        assert_eq!(profile.public_limit, Some(54));
    }
}
