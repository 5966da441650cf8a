//! Process-local mirror of a remotely owned collection.
//!
//! [`ReplicaCache`] keeps an in-memory mirror of uniquely identifiable
//! items whose source of truth is a remote repository or service. The
//! cache itself has no connection to that remote source; calling code
//! retrieves items, subscribes to change events, and keeps the mirror
//! synchronized through [`add`](ReplicaCache::add),
//! [`update`](ReplicaCache::update) and [`delete`](ReplicaCache::delete).
//!
//! # Population states
//!
//! The mirror is either *partial* or *fully populated*. Fully populated
//! is a claim that the contents exactly match the remote source; it is
//! established only by handing the cache a complete snapshot (seeding at
//! construction, or [`replace_all`](ReplicaCache::replace_all)), and it
//! is retracted by any operation that disproves it - an update or delete
//! for a key the mirror does not hold, or an eviction that removes
//! entries. Total views ([`size`](ReplicaCache::size),
//! [`all`](ReplicaCache::all)) are only answerable on a fully populated
//! mirror; callers should check
//! [`is_fully_populated`](ReplicaCache::is_fully_populated) and fall
//! back to the remote source otherwise.
//!
//! # Blocking reads
//!
//! [`get_timeout`](ReplicaCache::get_timeout) and
//! [`all_timeout`](ReplicaCache::all_timeout) let a task wait, up to a
//! deadline, for another task to supply the data they need. Waiters
//! never hold the cache lock while suspended.
//!
//! # Example
//!
//! ```ignore
//! let cache = ReplicaCache::new(|order: &Order| order.id);
//!
//! // Mirror maintenance, driven by remote change events elsewhere:
//! cache.add(order).await;
//!
//! // Point reads work in either population state:
//! if let Some(order) = cache.get(&order_id).await {
//!     /* served from the mirror */
//! }
//!
//! // Total views require a complete snapshot first:
//! cache.replace_all(fetch_everything().await).await;
//! let everything = cache.all().await?;
//! ```

mod signal;
mod store;

pub use replica_core::{CacheError, CacheResult, Clock, ManualClock, MutationKind, SystemClock};
pub use store::{CacheBuilder, CacheStats, ReplicaCache};
