//! Identity registries
//!
//! Entries are held weakly: an entity stays cached while something else (a
//! channel membership, a lobby, the caller) holds it, and becomes reclaimable
//! afterwards. Dead entries are swept every [`PURGE_INTERVAL`] insertions.

use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use bancho_domain::user_key;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::User;

const PURGE_INTERVAL: usize = 256;

pub(crate) struct WeakRegistry<K, T> {
    entries: DashMap<K, Weak<T>>,
    insertions: AtomicUsize,
}

impl<K, T> Default for WeakRegistry<K, T>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            insertions: AtomicUsize::new(0),
        }
    }
}

impl<K, T> WeakRegistry<K, T>
where
    K: Eq + Hash + Clone,
{
    pub fn get(&self, key: &K) -> Option<Arc<T>> {
        self.entries.get(key).and_then(|entry| entry.upgrade())
    }

    /// Return the live entry for `key` or store the one built by `create`.
    ///
    /// `create` runs under the shard lock and must not touch this registry.
    pub fn get_or_insert_with(&self, key: K, create: impl FnOnce() -> Arc<T>) -> Arc<T> {
        let value = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if let Some(live) = occupied.get().upgrade() {
                    return live;
                }
                let value = create();
                occupied.insert(Arc::downgrade(&value));
                value
            }
            Entry::Vacant(vacant) => {
                let value = create();
                vacant.insert(Arc::downgrade(&value));
                value
            }
        };
        self.note_insertion();
        value
    }

    pub fn insert(&self, key: K, value: &Arc<T>) {
        self.entries.insert(key, Arc::downgrade(value));
        self.note_insertion();
    }

    fn note_insertion(&self) {
        if self.insertions.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            self.purge();
        }
    }

    /// Drop entries whose entity has been reclaimed.
    pub fn purge(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.strong_count() > 0);
        before - self.entries.len()
    }

    /// Number of entries, alive or not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Users by normalised name and, once learned, by numeric id.
#[derive(Default)]
pub(crate) struct UserRegistry {
    by_name: WeakRegistry<String, User>,
    by_id: WeakRegistry<u64, User>,
}

impl UserRegistry {
    pub fn get(&self, name: &str) -> Option<Arc<User>> {
        self.by_name.get(&user_key(name))
    }

    pub fn get_or_create(&self, name: &str, create: impl FnOnce() -> Arc<User>) -> Arc<User> {
        self.by_name.get_or_insert_with(user_key(name), create)
    }

    /// Register an entity built outside the registry.
    pub fn insert(&self, user: &Arc<User>) {
        self.by_name.insert(user.key().to_string(), user);
        if let Some(id) = user.id() {
            self.by_id.insert(id, user);
        }
    }

    pub fn by_id(&self, id: u64) -> Option<Arc<User>> {
        self.by_id.get(&id)
    }

    pub fn index_id(&self, id: u64, user: &Arc<User>) {
        self.by_id.insert(id, user);
    }
}
