//! Sliding-window flood control for outgoing messages.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RateLimitConfig;

/// Which budget a message draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    /// Private messages and multiplayer channels
    Private,
    /// Public channels
    Public,
}

/// At most `limit` sends in any `window`.
struct SlidingWindow {
    window: Duration,
    limit: usize,
    sent: Mutex<VecDeque<Instant>>,
}

impl SlidingWindow {
    fn new(window: Duration, limit: usize) -> Self {
        Self {
            window,
            limit: limit.max(1),
            sent: Mutex::new(VecDeque::new()),
        }
    }

    fn sent(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take a token now, or return how long to wait for the next one.
    fn try_acquire(&self) -> Result<(), Duration> {
        let mut sent = self.sent();
        let now = Instant::now();
        while sent
            .front()
            .is_some_and(|at| now.duration_since(*at) >= self.window)
        {
            sent.pop_front();
        }

        if sent.len() < self.limit {
            sent.push_back(now);
            return Ok(());
        }
        let oldest = sent.front().copied().unwrap_or(now);
        Err((oldest + self.window).saturating_duration_since(now))
    }

    async fn acquire(&self) {
        while let Err(wait) = self.try_acquire() {
            tracing::trace!(wait_ms = wait.as_millis() as u64, "Rate limited");
            tokio::time::sleep(wait).await;
        }
    }
}

pub struct RateLimiter {
    private: SlidingWindow,
    public: Option<SlidingWindow>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            private: SlidingWindow::new(config.window, config.private_limit),
            public: config
                .public_limit
                .map(|limit| SlidingWindow::new(config.window, limit)),
        }
    }

    /// Wait until one message of `class` may be sent.
    ///
    /// Every message draws from the private budget; public messages also draw
    /// from the public budget when one is configured.
    pub async fn acquire(&self, class: MessageClass) {
        if class == MessageClass::Public {
            if let Some(public) = &self.public {
                public.acquire().await;
            }
        }
        self.private.acquire().await;
    }
}
