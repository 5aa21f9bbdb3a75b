use std::{
    collections::{hash_map::Entry, HashMap},
    convert::Infallible,
    fmt,
    hash::Hash,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::slot::Slot;

/// A concurrent memoizing cache without a size limit.
///
/// Each key is computed at most once. Concurrent callers for the same key wait
/// for the caller that got there first and all receive the same outcome,
/// including errors. Entries are never removed, so the caller is responsible for
/// bounding the number of distinct keys. See `LruCache` for a bounded variant.
pub struct Cache<K, V, E = Infallible> {
    slots: Mutex<HashMap<K, Arc<Slot<V, E>>>>,
}

impl<K, V, E> Default for Cache<K, V, E> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V, E> fmt::Debug for Cache<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache").field("len", &self.len()).finish()
    }
}

impl<K, V, E> Cache<K, V, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys ever requested, including those still being computed.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V, E> Cache<K, V, E>
where
    K: Hash + Eq,
    V: Clone,
    E: Clone,
{
    /// Get the memoized outcome for the key, running `init` if the key has
    /// never been requested.
    ///
    /// Multiple threads calling `get_or_try_init` on the same key is fine. Only
    /// the first one runs its `init`, without the cache lock held; the others
    /// block until it finishes and receive a clone of its outcome. An `Err` is
    /// memoized like any value and is never retried.
    ///
    /// # Panics
    ///
    /// Panics if the `init` that ran for this key panicked.
    pub fn get_or_try_init(&self, key: K, init: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        let (slot, leader) = {
            let mut slots = self.slots.lock();
            match slots.entry(key) {
                Entry::Occupied(ent) => (Arc::clone(ent.get()), false),
                Entry::Vacant(ent) => (Arc::clone(ent.insert(Arc::new(Slot::new()))), true),
            }
        };

        // IMPORTANT: Call user-provided init function without lock held.
        if leader {
            tracing::trace!("populating new key");
            slot.run(init)
        } else {
            tracing::trace!(ready = slot.is_ready(), "joining existing key");
            slot.wait()
        }
    }
}

impl<K, V> Cache<K, V, Infallible>
where
    K: Hash + Eq,
    V: Clone,
{
    /// Infallible version of `get_or_try_init`.
    pub fn get_or_init(&self, key: K, init: impl FnOnce() -> V) -> V {
        match self.get_or_try_init(key, || Ok(init())) {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }
}
