//! One-shot completion handles keyed by correlation context.
//!
//! A caller registers before sending its command and awaits the receiver; the
//! code path that observes the confirming reply resolves the key. Every waiter
//! registered under a key is completed exactly once.

use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::oneshot;

pub struct PendingRequests<K, T> {
    inner: HashMap<K, Vec<oneshot::Sender<T>>>,
}

impl<K, T> Default for PendingRequests<K, T> {
    fn default() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, T> PendingRequests<K, T> {
    /// Register a waiter for `key`.
    pub fn register(&mut self, key: K) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        self.inner.entry(key).or_default().push(tx);
        rx
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    /// Number of keys with at least one waiter.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Eq + Hash, T: Clone> PendingRequests<K, T> {
    /// Resolve and remove every waiter of `key`.
    ///
    /// Returns the number of waiters that were completed.
    pub fn resolve(&mut self, key: &K, value: T) -> usize {
        let Some(waiters) = self.inner.remove(key) else {
            return 0;
        };
        waiters
            .into_iter()
            .map(|tx| tx.send(value.clone()).is_ok())
            .filter(|sent| *sent)
            .count()
    }

    /// Complete every waiter of every key with `value`.
    pub fn resolve_all(&mut self, value: T) -> usize {
        self.inner
            .drain()
            .flat_map(|(_, waiters)| waiters)
            .map(|tx| tx.send(value.clone()).is_ok())
            .filter(|sent| *sent)
            .count()
    }
}
