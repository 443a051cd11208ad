//! Bounded LRU cache with single-flight population.
//!
//! Entries are `tokio::sync::OnceCell` slots shared through `Arc`: the first caller for a key
//! runs the initializer while concurrent callers for the same key await the same cell instead
//! of recomputing. Values are set at most once, so two racing writers can never leave the
//! cache with divergent values for one key. Capacity is enforced with least-recently-used
//! eviction; an evicted in-flight entry stays alive for its waiters through the `Arc`.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Bounded single-flight cache keyed by `K`.
pub struct SingleFlightCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: usize,
}

struct Inner<K, V> {
    map: HashMap<K, Arc<OnceCell<V>>>,
    order: VecDeque<K>,
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries (minimum one).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Fetch the entry cell for `key`, creating it and evicting as needed.
    fn entry(&self, key: &K) -> Arc<OnceCell<V>> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        if let Some(cell) = inner.map.get(key) {
            let cell = Arc::clone(cell);
            touch(&mut inner.order, key);
            return cell;
        }

        while inner.map.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
            } else {
                break;
            }
        }

        let cell = Arc::new(OnceCell::new());
        inner.map.insert(key.clone(), Arc::clone(&cell));
        inner.order.push_back(key.clone());
        cell
    }

    /// Return the cached value for `key` if it has been populated.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let cell = inner.map.get(key).map(Arc::clone)?;
        touch(&mut inner.order, key);
        drop(inner);
        cell.get().cloned()
    }

    /// Populate `key` with `value` unless another writer got there first.
    pub fn insert(&self, key: K, value: V) {
        let cell = self.entry(&key);
        let _ = cell.set(value);
    }

    /// Return the cached value for `key`, computing it through `init` on first access.
    ///
    /// Concurrent callers for the same key join the in-flight computation. An initializer
    /// failure leaves the slot empty so a later caller can retry.
    pub async fn get_or_try_compute<E, F, Fut>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = self.entry(&key);
        let value = cell.get_or_try_init(init).await?;
        Ok(value.clone())
    }

    /// Number of entries currently tracked (populated or in flight).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").map.len()
    }

    /// Whether the cache currently tracks no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn touch<K: Eq>(order: &mut VecDeque<K>, key: &K) {
    if let Some(idx) = order.iter().position(|k| k == key) {
        if let Some(entry) = order.remove(idx) {
            order.push_back(entry);
        }
    }
}
