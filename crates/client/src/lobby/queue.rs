//! Run-one-then-next execution queue
//!
//! Units run strictly in push order and a unit does not start before the
//! previous one, including its suspension points, has completed.

use std::future::Future;
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::{mpsc, oneshot};

use crate::error::{ClientError, ClientResult};

type Unit = BoxFuture<'static, ()>;

pub(super) struct SerialQueue {
    name: &'static str,
    tx: mpsc::UnboundedSender<Unit>,
    /// Taken by the worker on the first push
    rx: Mutex<Option<mpsc::UnboundedReceiver<Unit>>>,
}

impl SerialQueue {
    pub(super) fn new(name: &'static str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name,
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    pub(super) fn push(&self, unit: impl Future<Output = ()> + Send + 'static) {
        self.ensure_worker();
        if self.tx.send(unit.boxed()).is_err() {
            tracing::warn!(queue = self.name, "Queue worker is gone, unit dropped");
        }
    }

    /// Push `future` and wait for its output.
    pub(super) async fn run<T>(&self, future: impl Future<Output = T> + Send + 'static) -> ClientResult<T>
    where
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.push(async move {
            let _ = tx.send(future.await);
        });
        rx.await.map_err(|_| ClientError::ClientDropped)
    }

    fn ensure_worker(&self) {
        let taken = self
            .rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(mut rx) = taken {
            let name = self.name;
            tokio::spawn(async move {
                while let Some(unit) = rx.recv().await {
                    unit.await;
                }
                tracing::trace!(queue = name, "Queue worker stopped");
            });
        }
    }
}
