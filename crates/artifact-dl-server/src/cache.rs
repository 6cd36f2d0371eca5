//! Time-bounded LRU caches, one per resolution stage.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use lru::LruCache;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::config::StageLimits;

/// A value together with the moment it was stored.
struct Stamped<V> {
    value: V,
    stored_at: Instant,
}

/// Shared slot for one key. Every caller that finds the same slot awaits the
/// same initialisation, which is what collapses concurrent misses into a
/// single upstream fetch.
type Slot<V> = Arc<OnceCell<Stamped<V>>>;

/// Slots that hold a value live in the LRU. Slots still being filled are
/// kept aside in `pending` so eviction can never drop an in-flight fetch.
struct Slots<K, V> {
    stored: LruCache<K, Slot<V>>,
    pending: HashMap<K, Slot<V>>,
}

/// LRU cache whose entries expire `ttl` after they were stored.
pub struct StageCache<K, V> {
    name: &'static str,
    ttl: Duration,
    slots: Mutex<Slots<K, V>>,
}

impl<K, V> StageCache<K, V>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Create a cache. A zero capacity is treated as one.
    pub fn new(name: &'static str, limits: StageLimits) -> Self {
        let capacity = NonZeroUsize::new(limits.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            ttl: limits.ttl,
            slots: Mutex::new(Slots {
                stored: LruCache::new(capacity),
                pending: HashMap::new(),
            }),
        }
    }

    /// Return the fresh cached value for `key`, or run `compute` to fill it.
    ///
    /// Concurrent callers for the same key wait on one computation. Errors are
    /// handed back to the caller that ran `compute` and leave the slot empty,
    /// so the next caller tries again.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let (slot, pending) = self.slot_for(key);

        let result = slot
            .get_or_try_init(|| async {
                tracing::debug!(cache = self.name, ?key, "cache miss");
                let value = compute().await?;
                Ok::<_, E>(Stamped {
                    value,
                    stored_at: Instant::now(),
                })
            })
            .await
            .map(|stamped| stamped.value.clone());

        if pending {
            self.settle(key, &slot, result.is_ok());
        }
        result
    }

    /// Number of slots currently held, stored or in flight.
    pub fn len(&self) -> usize {
        let slots = self.lock();
        slots.stored.len() + slots.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the live slot for `key`. The flag is true when the slot is
    /// pending, i.e. not yet holding a fresh value.
    fn slot_for(&self, key: &K) -> (Slot<V>, bool) {
        let mut slots = self.lock();

        let expired = match slots.stored.get(key) {
            Some(slot) => match slot.get() {
                Some(stamped) if stamped.stored_at.elapsed() < self.ttl => {
                    tracing::debug!(cache = self.name, ?key, "cache hit");
                    return (slot.clone(), false);
                }
                _ => true,
            },
            None => false,
        };
        if expired {
            tracing::debug!(cache = self.name, ?key, "cache entry expired");
            slots.stored.pop(key);
        }

        // In flight, or the last attempt failed.
        if let Some(slot) = slots.pending.get(key) {
            return (slot.clone(), true);
        }

        let slot: Slot<V> = Arc::new(OnceCell::new());
        slots.pending.insert(key.clone(), slot.clone());
        (slot, true)
    }

    /// Move a filled pending slot into the LRU, or drop a failed one nobody
    /// else is waiting on.
    fn settle(&self, key: &K, slot: &Slot<V>, filled: bool) {
        let mut slots = self.lock();

        let ours = slots
            .pending
            .get(key)
            .is_some_and(|pending| Arc::ptr_eq(pending, slot));
        if !ours {
            return;
        }

        if filled {
            if let Some(slot) = slots.pending.remove(key) {
                slots.stored.put(key.clone(), slot);
            }
        } else if Arc::strong_count(slot) == 2 {
            // Only the map and this caller hold it; clones are only handed
            // out under the lock, so no waiter can appear now.
            slots.pending.remove(key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots<K, V>> {
        // Nothing panics while the lock is held, and the map stays consistent
        // even if something did.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
