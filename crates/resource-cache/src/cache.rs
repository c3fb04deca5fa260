use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{CacheConfig, CacheKey, MisuseError, Resource};

/// A cached resource together with its rolling expiration.
struct CacheSlot<T, E> {
    resource: Resource<T, E>,
    /// When the sweep is allowed to evict this slot.
    expires_at: Instant,
}

type Entries<T, E> = Mutex<HashMap<CacheKey, CacheSlot<T, E>>>;

/// Roughly 30 years, the horizon tokio uses for deadlines that cannot be represented.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Returns `now + duration`, saturating at a far future instant instead of overflowing.
fn deadline(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Locks the entries, ignoring poisoning.
///
/// A panicking factory cannot leave the map in an inconsistent state, as slots are only
/// inserted after the factory returned.
fn lock<T, E>(entries: &Entries<T, E>) -> MutexGuard<'_, HashMap<CacheKey, CacheSlot<T, E>>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes all entries that expired at or before `now` and returns how many were removed.
fn evict_expired<T, E>(entries: &Entries<T, E>, now: Instant) -> usize {
    let mut entries = lock(entries);
    let before = entries.len();
    entries.retain(|key, slot| {
        let expired = slot.expires_at <= now;
        if expired {
            tracing::trace!(%key, "Evicting expired resource");
        }
        !expired
    });
    before - entries.len()
}

/// The periodic sweep of a [`ResourceCache`].
///
/// Only holds a weak reference to the entries, and stops as soon as the cache is gone even if
/// it was not aborted.
async fn sweep<T, E>(entries: Weak<Entries<T, E>>, period: Duration) {
    let mut interval = time::interval_at(deadline(Instant::now(), period), period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let Some(entries) = entries.upgrade() else {
            break;
        };
        let evicted = evict_expired(&entries, Instant::now());
        if evicted > 0 {
            tracing::debug!(evicted, "Swept expired resources");
        }
    }
}

/// A cache of [`Resource`]s keyed by case-insensitive names.
///
/// Every lookup of a key, whether it creates the resource or finds an existing one, moves
/// the entry's expiration to `now + ttl`. A background sweep that runs every
/// [`sweep_interval`](CacheConfig::sweep_interval) evicts all entries whose expiration has
/// passed. The next lookup of an evicted key creates a fresh resource.
///
/// The sweep is a tokio task owned by the cache, and it is aborted when the cache is
/// dropped. Resources handed out by the cache are not affected by eviction or by dropping
/// the cache: they keep running and can still be read through any live handle.
///
/// Share the cache by reference or by wrapping it in an [`Arc`].
pub struct ResourceCache<T, E> {
    entries: Arc<Entries<T, E>>,
    ttl: Duration,
    runtime: Handle,
    sweeper: JoinHandle<()>,
}

impl<T, E> ResourceCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates a new cache and starts its sweep on the current tokio runtime.
    pub fn new(config: CacheConfig) -> Result<Self, MisuseError> {
        if config.sweep_interval.is_zero() {
            return Err(MisuseError::ZeroSweepInterval);
        }
        let runtime = Handle::try_current().map_err(|_| MisuseError::MissingRuntime)?;

        let entries = Arc::new(Entries::default());
        let sweeper = runtime.spawn(sweep(Arc::downgrade(&entries), config.sweep_interval));

        tracing::debug!(
            ttl = ?config.ttl,
            sweep_interval = ?config.sweep_interval,
            "Created resource cache"
        );

        Ok(Self {
            entries,
            ttl: config.ttl,
            runtime,
            sweeper,
        })
    }

    /// The time-to-live applied to entries on every lookup.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the resource cached under `key`, creating it with `factory` if necessary.
    ///
    /// Either way, the entry will not expire before `ttl` has passed from now. The factory
    /// is only invoked on a miss. It runs while the cache is locked and must not use this
    /// cache itself.
    pub fn get_or_create<F>(&self, key: &str, factory: F) -> Resource<T, E>
    where
        F: FnOnce() -> Resource<T, E>,
    {
        self.get_or_create_key(CacheKey::new(key), |_| factory())
    }

    /// Returns the resource cached under `key`, spawning `operation` for it if necessary.
    ///
    /// The operation receives the normalized key and is spawned on the runtime the cache
    /// was created on.
    pub fn get_or_spawn<F, Fut>(&self, key: &str, operation: F) -> Resource<T, E>
    where
        F: FnOnce(&str) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.get_or_create_key(CacheKey::new(key), |key| {
            Resource::spawn_on(&self.runtime, operation(key.as_str()))
        })
    }

    fn get_or_create_key<F>(&self, key: CacheKey, factory: F) -> Resource<T, E>
    where
        F: FnOnce(&CacheKey) -> Resource<T, E>,
    {
        let expires_at = deadline(Instant::now(), self.ttl);
        let mut entries = lock(&self.entries);

        if let Some(slot) = entries.get_mut(&key) {
            tracing::trace!(%key, "Resource cache hit");
            slot.expires_at = expires_at;
            return slot.resource.clone();
        }

        tracing::trace!(%key, "Resource cache miss");
        let resource = factory(&key);
        entries.insert(
            key,
            CacheSlot {
                resource: resource.clone(),
                expires_at,
            },
        );
        resource
    }

    /// Whether `key` currently has an entry. This does not refresh its expiration.
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).contains_key(&CacheKey::new(key))
    }

    /// Removes the entry for `key` right away and returns its resource.
    pub fn invalidate(&self, key: &str) -> Option<Resource<T, E>> {
        let key = CacheKey::new(key);
        let slot = lock(&self.entries).remove(&key)?;
        tracing::trace!(%key, "Invalidated resource");
        Some(slot.resource)
    }

    /// Removes all entries.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Runs a sweep pass right now, in addition to the periodic ones.
    ///
    /// Returns the number of evicted entries.
    pub fn evict_expired(&self) -> usize {
        evict_expired(&self.entries, Instant::now())
    }

    /// The number of entries, including expired ones that have not been swept yet.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether the cache has no entries.
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl<T, E> Drop for ResourceCache<T, E> {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

impl<T, E> fmt::Debug for ResourceCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .entries
            .try_lock()
            .map(|entries| entries.len())
            .unwrap_or_default();
        f.debug_struct("ResourceCache")
            .field("ttl", &self.ttl)
            .field("entries", &entries)
            .finish()
    }
}
