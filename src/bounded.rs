use std::{
    collections::HashMap, convert::Infallible, fmt, hash::Hash, marker::PhantomData, ops::DerefMut,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{
    error::Error,
    recency::{NodeIndex, RecencyList},
    slot::Slot,
};

type EvictionCallback<K> = Box<dyn Fn(K) + Send + Sync>;

struct Entry<V, E> {
    slot: Arc<Slot<V, E>>,
    node: NodeIndex,
}

struct LruState<K, V, E> {
    map: HashMap<K, Entry<V, E>>,

    /// Keys in `map`, in recency order. The two always hold the same key set.
    list: RecencyList<K>,

    capacity: usize,
}

impl<K, V, E> LruState<K, V, E>
where
    K: Hash + Eq,
{
    /// Unlink the least recently used entry from both the list and the map.
    fn evict_oldest(&mut self) -> Option<(K, Entry<V, E>)> {
        let key = self.list.pop_back()?;
        match self.map.remove(&key) {
            Some(entry) => Some((key, entry)),
            None => unreachable!("recency list out of sync with map"),
        }
    }
}

/// Configures and constructs an `LruCache`.
pub struct LruBuilder<K, V, E = Infallible> {
    capacity: i64,
    on_evict: Option<EvictionCallback<K>>,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<K, V, E> LruBuilder<K, V, E> {
    /// Call `f` with the key of every entry evicted to make room for a new one.
    ///
    /// The callback runs on the thread that inserted the new key, after the
    /// cache lock is released but before that thread's own init function. It
    /// should be fast and must not call back into the cache for the evicted key.
    /// When several threads evict concurrently, their callbacks may run in a
    /// different order than the evictions happened.
    ///
    /// A panicking callback poisons the key being inserted, exactly as if its
    /// init function had panicked.
    pub fn on_evict(mut self, f: impl Fn(K) + Send + Sync + 'static) -> Self {
        self.on_evict = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Result<LruCache<K, V, E>, Error> {
        if self.capacity <= 0 {
            return Err(Error::InvalidCapacity(self.capacity));
        }
        // Nothing is allocated up front, so a capacity beyond `usize` is never reached.
        let capacity = usize::try_from(self.capacity).unwrap_or(usize::MAX);

        Ok(LruCache {
            state: Mutex::new(LruState {
                map: HashMap::new(),
                list: RecencyList::new(),
                capacity,
            }),
            on_evict: self.on_evict,
        })
    }
}

/// A concurrent memoizing LRU cache.
///
/// Like `Cache`, each key is computed at most once while it is cached, and
/// concurrent callers for the same key share one outcome. At most `capacity`
/// keys are held; admitting a new key to a full cache evicts the least recently
/// used one. Every request for a key, hit or miss, marks it most recently used,
/// even while its value is still being computed.
///
/// An entry may be evicted while its init function is still running. Callers
/// already waiting on it still receive the outcome; later requests for that key
/// start a fresh computation.
pub struct LruCache<K, V, E = Infallible> {
    state: Mutex<LruState<K, V, E>>,
    on_evict: Option<EvictionCallback<K>>,
}

impl<K, V, E> fmt::Debug for LruCache<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LruCache")
            .field("len", &state.map.len())
            .field("capacity", &state.capacity)
            .finish()
    }
}

impl<K, V, E> LruCache<K, V, E> {
    /// Fails with `Error::InvalidCapacity` unless `capacity > 0`.
    pub fn new(capacity: i64) -> Result<Self, Error> {
        Self::builder(capacity).build()
    }

    pub fn builder(capacity: i64) -> LruBuilder<K, V, E> {
        LruBuilder {
            capacity,
            on_evict: None,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }
}

impl<K, V, E> LruCache<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
    E: Clone,
{
    /// Get the memoized outcome for the key, running `init` if the key is not
    /// cached. The key becomes the most recently used.
    ///
    /// Multiple threads calling `get_or_try_init` on the same key is fine. Only
    /// the first one runs its `init`, without the cache lock held; the others
    /// block until it finishes and receive a clone of its outcome. An `Err` is
    /// memoized until the key is evicted.
    ///
    /// # Panics
    ///
    /// Panics if the `init` that ran for this key panicked.
    pub fn get_or_try_init(&self, key: K, init: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        let mut guard = self.state.lock();
        let this = guard.deref_mut();

        if let Some(entry) = this.map.get(&key) {
            this.list.move_to_front(entry.node);
            let slot = Arc::clone(&entry.slot);
            drop(guard);
            tracing::trace!(ready = slot.is_ready(), "joining existing key");
            return slot.wait();
        }

        let evicted = if this.map.len() >= this.capacity {
            this.evict_oldest()
        } else {
            None
        };

        let slot = Arc::new(Slot::new());
        let node = this.list.push_front(key.clone());
        this.map.insert(
            key,
            Entry {
                slot: Arc::clone(&slot),
                node,
            },
        );
        debug_assert_eq!(this.map.len(), this.list.len());
        let (len, capacity) = (this.map.len(), this.capacity);
        drop(guard);

        // IMPORTANT: Drop user value and run callbacks without lock held.
        // Both happen inside `run` so a panic there poisons the new slot
        // instead of leaving it pending forever.
        tracing::trace!(len, "populating new key");
        slot.run(move || {
            if let Some((key, entry)) = evicted {
                tracing::debug!(capacity, len, "evicted least recently used key");
                drop(entry);
                if let Some(on_evict) = &self.on_evict {
                    on_evict(key);
                }
            }
            init()
        })
    }

    #[cfg(test)]
    fn keys_by_recency(&self) -> Vec<K> {
        self.state.lock().list.iter().cloned().collect()
    }
}

impl<K, V> LruCache<K, V, Infallible>
where
    K: Hash + Eq + Clone,
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
