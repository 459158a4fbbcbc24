//! Connection lifecycle
//!
//! One session task per connection attempt owns the socket: a read half that
//! frames and dispatches lines, and a write half fed by an unbounded queue.
//! Every attempt carries a generation number; callbacks from a superseded
//! attempt are ignored.

use std::sync::Weak;
use std::time::Duration;

use bancho_shared::{Command, IrcLine, LineFramer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{ClientError, ClientResult};
use crate::infrastructure::messaging::ConnectionState;

use super::{dispatcher, ClientEvent, ClientInner};

const READ_BUFFER_SIZE: usize = 4096;

pub(super) enum Outbound {
    Line(String),
    /// Send QUIT, then close the write half
    Quit,
}

#[derive(Default)]
pub(super) struct ConnectionCore {
    state: ConnectionState,
    reconnect: bool,
    generation: u64,
    writer: Option<mpsc::UnboundedSender<Outbound>>,
    session: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
    connect_waiter: Option<oneshot::Sender<ClientResult<()>>>,
}

impl ConnectionCore {
    /// Apply a transition; invalid or redundant ones leave the state untouched.
    fn transition(&mut self, next: ConnectionState, error: Option<&ClientError>) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::debug!(from = %self.state, to = %next, "Ignored connection transition");
            return false;
        }
        if next == ConnectionState::Reconnecting && error.is_none() {
            tracing::warn!(from = %self.state, "Reconnecting requires a triggering error");
            return false;
        }
        self.state = next;
        true
    }

    /// Invalidate the current attempt and stop its tasks.
    fn teardown(&mut self) {
        self.generation += 1;
        self.writer = None;
        if let Some(session) = self.session.take() {
            session.abort();
        }
        if let Some(retry) = self.retry.take() {
            retry.abort();
        }
    }

    fn send(&self, line: String) -> ClientResult<()> {
        self.writer
            .as_ref()
            .and_then(|writer| writer.send(Outbound::Line(line)).ok())
            .ok_or(ClientError::Disconnected)
    }
}

impl ClientInner {
    pub(crate) fn state(&self) -> ConnectionState {
        self.core().state
    }

    fn is_current(&self, generation: u64) -> bool {
        self.core().generation == generation
    }

    /// Publish a transition. Never called with the core locked.
    fn notify(&self, state: ConnectionState, error: Option<ClientError>) {
        match &error {
            Some(err) => tracing::info!(state = %state, error = %err, "Connection state changed"),
            None => tracing::info!(state = %state, "Connection state changed"),
        }
        self.events.publish(ClientEvent::State {
            state,
            error: error.clone(),
        });
        match state {
            ConnectionState::Connected => self.events.publish(ClientEvent::Connected),
            ConnectionState::Disconnected => {
                self.events.publish(ClientEvent::Disconnected { error })
            }
            ConnectionState::Connecting | ConnectionState::Reconnecting => {}
        }
    }

    pub(super) async fn connect(&self) -> ClientResult<()> {
        self.config.validate()?;

        let rx = {
            let mut core = self.core();
            if core.state.is_active() {
                return Err(ClientError::AlreadyConnected);
            }
            if let Some(retry) = core.retry.take() {
                retry.abort();
            }
            core.reconnect = self.config.reconnect;
            let (tx, rx) = oneshot::channel();
            if let Some(previous) = core.connect_waiter.replace(tx) {
                let _ = previous.send(Err(ClientError::Disconnected));
            }
            if !self.begin_connecting(&mut core) {
                return Err(ClientError::AlreadyConnected);
            }
            rx
        };

        self.outgoing.start(self.me.clone());
        self.notify(ConnectionState::Connecting, None);
        rx.await.map_err(|_| ClientError::ClientDropped)?
    }

    fn begin_connecting(&self, core: &mut ConnectionCore) -> bool {
        if !core.transition(ConnectionState::Connecting, None) {
            return false;
        }
        core.generation += 1;
        let generation = core.generation;
        core.session = Some(tokio::spawn(run_session(self.me.clone(), generation)));
        true
    }

    fn on_close(&self, generation: u64, error: ClientError) {
        let (next, waiter) = {
            let mut core = self.core();
            if core.generation != generation || core.state.is_disconnected() {
                return;
            }
            core.writer = None;
            core.session = None;
            let next = if core.reconnect {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Disconnected
            };
            if !core.transition(next, Some(&error)) {
                return;
            }
            if next == ConnectionState::Reconnecting {
                let retry = tokio::spawn(retry_after(self.me.clone(), self.config.reconnect_delay));
                if let Some(previous) = core.retry.replace(retry) {
                    previous.abort();
                }
            }
            (next, core.connect_waiter.take())
        };

        tracing::warn!(error = %error, "Connection lost");
        if let Some(waiter) = waiter {
            let _ = waiter.send(Err(error.clone()));
        }
        self.reset_session(&error);
        self.notify(next, Some(error));
    }

    fn retry_fired(&self) {
        let started = {
            let mut core = self.core();
            core.retry = None;
            core.state == ConnectionState::Reconnecting && self.begin_connecting(&mut core)
        };
        if started {
            self.notify(ConnectionState::Connecting, None);
        }
    }

    /// The gateway accepted the credentials (`001`).
    pub(super) fn on_welcome(&self) {
        let waiter = {
            let mut core = self.core();
            if !core.transition(ConnectionState::Connected, None) {
                return;
            }
            core.connect_waiter.take()
        };

        tracing::info!(username = %self.config.username, "Authenticated");
        if let Some(waiter) = waiter {
            let _ = waiter.send(Ok(()));
        }
        self.notify(ConnectionState::Connected, None);

        if self.config.auto_rejoin {
            let names: Vec<String> = self
                .joined
                .iter()
                .map(|entry| entry.value().name().to_string())
                .collect();
            for name in names {
                tracing::debug!(channel = %name, "Rejoining channel");
                if let Err(err) = self.write_command(Command::Join(name)) {
                    tracing::warn!(error = %err, "Failed to rejoin channel");
                }
            }
        }
    }

    /// The gateway rejected the credentials (`464`). Terminal.
    pub(super) fn on_auth_failed(&self) {
        let error = ClientError::AuthenticationFailed;
        let waiter = {
            let mut core = self.core();
            core.reconnect = false;
            if !core.transition(ConnectionState::Disconnected, Some(&error)) {
                return;
            }
            core.teardown();
            core.connect_waiter.take()
        };

        tracing::error!(username = %self.config.username, "Authentication failed");
        if let Some(waiter) = waiter {
            let _ = waiter.send(Err(error.clone()));
        }
        self.reset_session(&error);
        self.notify(ConnectionState::Disconnected, Some(error));
    }

    pub(super) fn disconnect(&self) {
        let previous = {
            let mut core = self.core();
            core.reconnect = false;
            if let Some(retry) = core.retry.take() {
                retry.abort();
            }
            if core.state.is_disconnected() {
                return;
            }
            let previous = core.state;
            if previous.is_connected() {
                // Detach the session so it can flush QUIT and close on its own
                if let Some(writer) = core.writer.take() {
                    let _ = writer.send(Outbound::Quit);
                }
                core.generation += 1;
                core.session = None;
            } else {
                core.teardown();
            }
            core.transition(ConnectionState::Disconnected, None);
            if let Some(waiter) = core.connect_waiter.take() {
                let _ = waiter.send(Err(ClientError::Disconnected));
            }
            previous
        };

        tracing::info!(from = %previous, "Disconnecting");
        self.reset_session(&ClientError::Disconnected);
        self.notify(ConnectionState::Disconnected, None);
    }

    /// Queue a command; only allowed once authenticated.
    pub(crate) fn write_command(&self, command: Command) -> ClientResult<()> {
        let core = self.core();
        if !core.state.is_connected() {
            return Err(ClientError::Disconnected);
        }
        core.send(command.to_line())
    }

    /// Queue a command on any open transport, authenticated or not.
    pub(super) fn write_raw(&self, command: Command) -> ClientResult<()> {
        self.core().send(command.to_line())
    }
}

#[cfg(test)]
impl ClientInner {
    /// Authenticate over an in-memory transport and return its outbound queue.
    pub(super) fn attach_test_transport(&self) -> mpsc::UnboundedReceiver<Outbound> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut core = self.core();
            core.state = ConnectionState::Connected;
            core.writer = Some(tx);
        }
        self.outgoing.start(self.me.clone());
        rx
    }

    pub(super) fn detach_test_transport(&self) {
        let mut core = self.core();
        core.state = ConnectionState::Disconnected;
        core.writer = None;
    }
}

async fn retry_after(client: Weak<ClientInner>, delay: Duration) {
    tokio::time::sleep(delay).await;
    if let Some(inner) = client.upgrade() {
        inner.retry_fired();
    }
}

async fn run_session(client: Weak<ClientInner>, generation: u64) {
    let error = match session_io(&client, generation).await {
        Ok(()) => ClientError::connection_closed(),
        Err(err) => err,
    };
    if let Some(inner) = client.upgrade() {
        inner.on_close(generation, error);
    }
}

async fn session_io(client: &Weak<ClientInner>, generation: u64) -> ClientResult<()> {
    let (address, connect_timeout, idle_timeout, handshake) = {
        let inner = client.upgrade().ok_or(ClientError::ClientDropped)?;
        let config = &inner.config;
        (
            format!("{}:{}", config.host, config.port),
            config.connect_timeout,
            config.idle_timeout,
            Command::handshake(&config.username, &config.password),
        )
    };

    tracing::debug!(address = %address, "Opening transport");
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&address))
        .await
        .map_err(|_| ClientError::connect_timeout())??;
    let (reader, writer) = stream.into_split();

    let (tx, rx) = mpsc::unbounded_channel();
    for command in &handshake {
        let _ = tx.send(Outbound::Line(command.to_line()));
    }
    {
        let inner = client.upgrade().ok_or(ClientError::ClientDropped)?;
        let mut core = inner.core();
        if core.generation != generation {
            return Ok(());
        }
        core.writer = Some(tx);
    }

    tokio::select! {
        result = read_loop(client, generation, reader, idle_timeout) => result,
        result = write_loop(writer, rx) => result,
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
) -> ClientResult<()> {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Line(line) => {
                if !line.starts_with("PASS ") {
                    tracing::trace!(line = %line, "Sending line");
                }
                writer.write_all(format!("{line}\r\n").as_bytes()).await?;
            }
            Outbound::Quit => {
                writer
                    .write_all(format!("{}\r\n", Command::Quit.to_line()).as_bytes())
                    .await?;
                writer.shutdown().await?;
                return Ok(());
            }
        }
    }
    Ok(())
}

async fn read_loop(
    client: &Weak<ClientInner>,
    generation: u64,
    mut reader: OwnedReadHalf,
    idle_timeout: Duration,
) -> ClientResult<()> {
    let mut framer = LineFramer::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    loop {
        let read = tokio::time::timeout(idle_timeout, reader.read(&mut buffer))
            .await
            .map_err(|_| ClientError::idle_timeout())??;
        if read == 0 {
            return Err(ClientError::connection_closed());
        }

        for raw in framer.push(&buffer[..read]) {
            let inner = client.upgrade().ok_or(ClientError::ClientDropped)?;
            // A detached session keeps draining until the gateway closes
            if !inner.is_current(generation) {
                continue;
            }
            match IrcLine::parse(&raw) {
                Ok(line) => dispatcher::dispatch(&inner, &line),
                Err(err) => tracing::warn!(error = %err, line = %raw, "Malformed protocol line"),
            }
        }
    }
}
