//! Outgoing message pipeline
//!
//! Every chat message goes through one FIFO worker: wait for the rate
//! limiter, write the line, then publish the `self_sent` echo. Submission
//! order is delivery order.

use std::sync::{Arc, Mutex, Weak};

use bancho_shared::{sanitize_body, Command};
use tokio::sync::{mpsc, oneshot};

use crate::entities::{Channel, ChannelEvent, Message, User};
use crate::error::{ClientError, ClientResult};
use crate::infrastructure::rate_limiter::MessageClass;

use super::{ClientEvent, ClientInner};

/// Destination of an outgoing message.
#[derive(Debug, Clone)]
pub enum Recipient {
    User(Arc<User>),
    Channel(Arc<Channel>),
}

impl Recipient {
    pub fn name(&self) -> &str {
        match self {
            Recipient::User(user) => user.name(),
            Recipient::Channel(channel) => channel.name(),
        }
    }

    /// Multiplayer channels share the private budget.
    fn class(&self) -> MessageClass {
        match self {
            Recipient::Channel(channel) if !channel.is_multiplayer() => MessageClass::Public,
            _ => MessageClass::Private,
        }
    }
}

struct OutgoingRequest {
    recipient: Recipient,
    body: String,
    done: oneshot::Sender<ClientResult<()>>,
}

pub(super) struct OutgoingQueue {
    tx: mpsc::UnboundedSender<OutgoingRequest>,
    /// Taken by the worker on the first connect
    rx: Mutex<Option<mpsc::UnboundedReceiver<OutgoingRequest>>>,
}

impl OutgoingQueue {
    pub(super) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    fn is_started(&self) -> bool {
        self.rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    /// Spawn the worker unless it already runs.
    pub(super) fn start(&self, client: Weak<ClientInner>) {
        let taken = self
            .rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(rx) = taken {
            tokio::spawn(run_worker(client, rx));
        }
    }
}

impl ClientInner {
    /// Queue a message; resolves once it is written or has failed.
    pub(crate) async fn submit(&self, recipient: Recipient, body: String) -> ClientResult<()> {
        if !self.outgoing.is_started() {
            return Err(ClientError::Disconnected);
        }
        let (done, rx) = oneshot::channel();
        self.outgoing
            .tx
            .send(OutgoingRequest {
                recipient,
                body: sanitize_body(&body),
                done,
            })
            .map_err(|_| ClientError::ClientDropped)?;
        rx.await.map_err(|_| ClientError::ClientDropped)?
    }

    fn echo(&self, recipient: &Recipient, body: &str) {
        match recipient {
            Recipient::User(user) => {
                let message = Message::private(self.self_user(), Arc::clone(user), body).sent_by_self();
                user.events().publish(message.clone());
                self.events.publish(ClientEvent::PrivateMessage(message));
            }
            Recipient::Channel(channel) => {
                let message =
                    Message::channel(self.self_user(), Arc::clone(channel), body).sent_by_self();
                channel
                    .events()
                    .publish(ChannelEvent::Message(message.clone()));
                self.events.publish(ClientEvent::ChannelMessage(message));
            }
        }
    }
}

async fn run_worker(client: Weak<ClientInner>, mut rx: mpsc::UnboundedReceiver<OutgoingRequest>) {
    while let Some(request) = rx.recv().await {
        let result = deliver(&client, &request).await;
        if let Err(err) = &result {
            tracing::debug!(target = %request.recipient.name(), error = %err, "Message not sent");
        }
        let _ = request.done.send(result);
    }
    tracing::debug!("Outgoing worker stopped");
}

async fn deliver(client: &Weak<ClientInner>, request: &OutgoingRequest) -> ClientResult<()> {
    let inner = client.upgrade().ok_or(ClientError::ClientDropped)?;
    if !inner.state().is_connected() {
        return Err(ClientError::Disconnected);
    }
    inner.rate_limiter.acquire(request.recipient.class()).await;

    inner.write_command(Command::Privmsg {
        target: request.recipient.name().to_string(),
        body: request.body.clone(),
    })?;
    inner.echo(&request.recipient, &request.body);
    Ok(())
}
