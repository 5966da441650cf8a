//! The mirror cache itself.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use replica_core::{CacheEntry, CacheError, CacheResult, Clock, MutationKind, SystemClock};

use crate::signal::MutationSignal;

type IdentityFn<T, K> = Box<dyn Fn(&T) -> K + Send + Sync>;

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found their key.
    pub hits: u64,
    /// Lookups that did not.
    pub misses: u64,
    /// Entries removed by eviction operations.
    pub evictions: u64,
    /// Entries currently held.
    pub entry_count: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, `0.0` when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct MirrorState<T, K> {
    entries: HashMap<K, CacheEntry<T>>,
    fully_populated: bool,
    hits: u64,
    misses: u64,
    evictions: u64,
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builder covering the construction variants of [`ReplicaCache`].
///
/// Obtained from [`ReplicaCache::builder`]. By default the built cache
/// starts empty, partial, and on the system wall clock.
pub struct CacheBuilder<T, K> {
    identity: IdentityFn<T, K>,
    clock: Arc<dyn Clock>,
    seed: Option<Vec<T>>,
}

impl<T, K> CacheBuilder<T, K>
where
    K: Eq + Hash,
{
    /// Use `clock` instead of the system wall clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Pre-populate with a complete snapshot of the remote source; the
    /// built cache starts fully populated. An empty snapshot still
    /// counts as complete.
    pub fn seed<I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        self.seed = Some(items.into_iter().collect());
        self
    }

    /// Build the cache.
    pub fn build(self) -> ReplicaCache<T, K> {
        let fully_populated = self.seed.is_some();
        let now = self.clock.now_millis();
        let mut entries = HashMap::new();
        for item in self.seed.into_iter().flatten() {
            let key = (self.identity)(&item);
            entries.insert(key, CacheEntry::new(item, now));
        }
        ReplicaCache {
            state: RwLock::new(MirrorState {
                entries,
                fully_populated,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            signal: MutationSignal::new(),
            clock: self.clock,
            identity: self.identity,
        }
    }
}

// ============================================================================
// CACHE
// ============================================================================

/// In-memory mirror of a collection of uniquely identifiable items owned
/// by a remote source of truth.
///
/// Items can be of any type; a caller-supplied identity function maps
/// each item to its unique key. The cache tracks whether it is a
/// complete replica of the remote source (see the crate docs for the
/// population model) and stamps every entry with created, accessed, and
/// modified timestamps that drive the `evict_*` family.
///
/// All state lives behind one lock; any number of tasks may use a shared
/// cache concurrently, and the blocking reads suspend without holding
/// it.
pub struct ReplicaCache<T, K> {
    state: RwLock<MirrorState<T, K>>,
    signal: MutationSignal,
    clock: Arc<dyn Clock>,
    identity: IdentityFn<T, K>,
}

impl<T, K> ReplicaCache<T, K>
where
    T: Clone,
    K: Eq + Hash + fmt::Debug,
{
    /// An empty, partial cache on the system wall clock.
    pub fn new(identity: impl Fn(&T) -> K + Send + Sync + 'static) -> Self {
        Self::builder(identity).build()
    }

    /// A fully populated cache seeded with a complete snapshot of the
    /// remote source.
    pub fn seeded(
        identity: impl Fn(&T) -> K + Send + Sync + 'static,
        items: impl IntoIterator<Item = T>,
    ) -> Self {
        Self::builder(identity).seed(items).build()
    }

    /// A [`CacheBuilder`] for the remaining construction variants, such
    /// as injecting a [`Clock`].
    pub fn builder(identity: impl Fn(&T) -> K + Send + Sync + 'static) -> CacheBuilder<T, K> {
        CacheBuilder {
            identity: Box::new(identity),
            clock: Arc::new(SystemClock::new()),
            seed: None,
        }
    }

    /// Whether the cache currently claims to be a complete replica of
    /// the remote source.
    pub async fn is_fully_populated(&self) -> bool {
        self.state.read().await.fully_populated
    }

    /// Whether an item with `key` is currently mirrored.
    ///
    /// On a partial cache a `false` only means the item is not cached;
    /// on a fully populated one it means the item does not exist in the
    /// remote source either.
    pub async fn contains(&self, key: &K) -> bool {
        self.state.read().await.entries.contains_key(key)
    }

    /// Look up the item stored under `key`, marking its entry as
    /// accessed.
    ///
    /// Absence is an ordinary `None`, not an error; on a partial cache
    /// it says nothing about the remote source.
    pub async fn get(&self, key: &K) -> Option<T> {
        let mut state = self.state.write().await;
        match state.entries.remove_entry(key) {
            Some((key, entry)) => {
                let entry = entry.with_accessed(self.clock.now_millis());
                let item = entry.item().clone();
                state.entries.insert(key, entry);
                state.hits += 1;
                Some(item)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Like [`get`](Self::get), but on a miss wait up to `timeout` for
    /// another task to insert the key via [`add`](Self::add),
    /// [`update`](Self::update) or [`replace_all`](Self::replace_all).
    ///
    /// Absence at the deadline is still an ordinary `None`; the deadline
    /// itself is not an error.
    pub async fn get_timeout(&self, key: &K, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        // Subscribe before the first lookup so an insert racing this
        // call is either seen directly or re-checked after its wake.
        let mut listener = self.signal.subscribe();
        loop {
            if let Some(item) = self.get(key).await {
                return Some(item);
            }
            if !listener.changed_before(deadline).await {
                // One last look in case an insert raced the deadline.
                return self.get(key).await;
            }
        }
    }

    /// Total number of items in the remote source.
    ///
    /// Only a fully populated cache knows this; a partial cache's entry
    /// count has no relation to the remote total, so asking for it is
    /// [`CacheError::NotFullyPopulated`].
    pub async fn size(&self) -> CacheResult<usize> {
        let state = self.state.read().await;
        if !state.fully_populated {
            return Err(CacheError::NotFullyPopulated);
        }
        Ok(state.entries.len())
    }

    /// Every item in the remote source, in no particular order.
    ///
    /// Fails with [`CacheError::NotFullyPopulated`] unless the cache is
    /// a complete replica.
    pub async fn all(&self) -> CacheResult<Vec<T>> {
        let state = self.state.read().await;
        if !state.fully_populated {
            return Err(CacheError::NotFullyPopulated);
        }
        Ok(state
            .entries
            .values()
            .map(|entry| entry.item().clone())
            .collect())
    }

    /// Like [`all`](Self::all), but wait up to `timeout` for another
    /// task to fully populate the cache via
    /// [`replace_all`](Self::replace_all).
    ///
    /// Fails with [`CacheError::PollingTimeout`] if the deadline passes
    /// with the cache still partial.
    pub async fn all_timeout(&self, timeout: Duration) -> CacheResult<Vec<T>> {
        let deadline = Instant::now() + timeout;
        let mut listener = self.signal.subscribe();
        loop {
            if let Ok(items) = self.all().await {
                return Ok(items);
            }
            if !listener.changed_before(deadline).await {
                return self
                    .all()
                    .await
                    .map_err(|_| CacheError::PollingTimeout { waited: timeout });
            }
        }
    }

    /// Insert an item, overwriting any previous entry for its key with a
    /// fresh creation timestamp.
    ///
    /// Adding never changes the population state: a new item is taken to
    /// be a genuine addition to the remote source, which a complete
    /// mirror stays complete under.
    pub async fn add(&self, item: T) {
        let key = (self.identity)(&item);
        let now = self.clock.now_millis();
        {
            let mut state = self.state.write().await;
            state.entries.insert(key, CacheEntry::new(item, now));
        }
        self.signal.raise();
    }

    /// Replace a previously cached item, stamping its entry as modified.
    ///
    /// A missing key on a partial cache is unremarkable; the item is
    /// simply inserted as new. A missing key on a fully populated cache
    /// disproves the completeness claim: the item is still inserted, the
    /// cache downgrades itself to partial, and
    /// [`CacheError::SynchronizationInconsistency`] is returned. Both
    /// effects are committed before the error surfaces, so callers may
    /// log it and continue.
    pub async fn update(&self, item: T) -> CacheResult<()> {
        let key = (self.identity)(&item);
        let now = self.clock.now_millis();
        let result = {
            let mut state = self.state.write().await;
            match state.entries.remove_entry(&key) {
                Some((key, entry)) => {
                    state.entries.insert(key, entry.with_modified(item, now));
                    Ok(())
                }
                None if state.fully_populated => {
                    state.fully_populated = false;
                    tracing::warn!(
                        key = ?key,
                        "update for a key the complete mirror did not hold; now partial"
                    );
                    let error = CacheError::SynchronizationInconsistency {
                        operation: MutationKind::Update,
                        key: format!("{key:?}"),
                    };
                    state.entries.insert(key, CacheEntry::new(item, now));
                    Err(error)
                }
                None => {
                    state.entries.insert(key, CacheEntry::new(item, now));
                    Ok(())
                }
            }
        };
        self.signal.raise();
        result
    }

    /// Remove the item stored under `key`.
    ///
    /// A missing key on a partial cache is a no-op. On a fully populated
    /// cache it disproves the completeness claim: nothing is removed,
    /// the cache downgrades itself to partial, and
    /// [`CacheError::SynchronizationInconsistency`] is returned.
    pub async fn delete(&self, key: &K) -> CacheResult<()> {
        let result = {
            let mut state = self.state.write().await;
            if state.entries.remove(key).is_some() {
                Ok(())
            } else if state.fully_populated {
                state.fully_populated = false;
                tracing::warn!(
                    key = ?key,
                    "delete for a key the complete mirror did not hold; now partial"
                );
                Err(CacheError::SynchronizationInconsistency {
                    operation: MutationKind::Delete,
                    key: format!("{key:?}"),
                })
            } else {
                Ok(())
            }
        };
        self.signal.raise();
        result
    }

    /// Replace the entire contents with a complete snapshot of the
    /// remote source and mark the cache fully populated.
    ///
    /// This is the only way a partial cache becomes complete. Every
    /// blocked reader is woken: tasks in
    /// [`all_timeout`](Self::all_timeout) observe the new snapshot, and
    /// tasks in [`get_timeout`](Self::get_timeout) find their key if the
    /// snapshot carries it. An empty snapshot is still complete; it
    /// mirrors a remote source that currently holds nothing.
    pub async fn replace_all(&self, items: impl IntoIterator<Item = T>) {
        let now = self.clock.now_millis();
        {
            let mut state = self.state.write().await;
            state.entries.clear();
            for item in items {
                let key = (self.identity)(&item);
                state.entries.insert(key, CacheEntry::new(item, now));
            }
            state.fully_populated = true;
            tracing::trace!(entries = state.entries.len(), "mirror repopulated");
        }
        self.signal.raise();
    }

    // ------------------------------------------------------------------
    // Eviction
    // ------------------------------------------------------------------

    /// Remove entries that were never read, or last read more than
    /// `max_age` ago. Returns the number removed.
    pub async fn evict_unaccessed(&self, max_age: Duration) -> usize {
        let cutoff = self.cutoff(max_age);
        self.evict_where(|entry| entry.accessed().map_or(true, |at| at < cutoff))
            .await
    }

    /// Remove entries that were never modified, or last modified more
    /// than `max_age` ago. Returns the number removed.
    pub async fn evict_unmodified(&self, max_age: Duration) -> usize {
        let cutoff = self.cutoff(max_age);
        self.evict_where(|entry| entry.modified().map_or(true, |at| at < cutoff))
            .await
    }

    /// Remove entries first inserted more than `max_age` ago, no matter
    /// how recently they were read or modified. Returns the number
    /// removed.
    pub async fn evict_by_age(&self, max_age: Duration) -> usize {
        let cutoff = self.cutoff(max_age);
        self.evict_where(|entry| entry.created() < cutoff).await
    }

    /// Remove every entry. Returns the number removed.
    pub async fn evict_all(&self) -> usize {
        self.evict_where(|_| true).await
    }

    /// Snapshot of the cache counters.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            entry_count: state.entries.len(),
        }
    }

    fn cutoff(&self, max_age: Duration) -> i64 {
        self.clock
            .now_millis()
            .saturating_sub(max_age.as_millis() as i64)
    }

    /// Remove every entry matching `predicate`. A mirror that loses at
    /// least one entry can no longer claim completeness; losing none
    /// leaves the population state as it was. Evictions satisfy no
    /// waiter's condition, so none are woken.
    async fn evict_where(&self, predicate: impl Fn(&CacheEntry<T>) -> bool) -> usize {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|_, entry| !predicate(entry));
        let evicted = before - state.entries.len();
        if evicted > 0 {
            state.fully_populated = false;
            state.evictions += evicted as u64;
            tracing::debug!(evicted, "evicted entries from the mirror");
        }
        evicted
    }
}

// ============================================================================
// TESTS
// ============================================================================
