//! A pluggable point for callers to cache deserialized inventories in front of a
//! [`crate::ocfl::store::OcflStore`], keyed by object ID.
//!
//! The engine itself ships no real cache implementation -- just this trait and a [`NoopCache`]
//! default so a `CommitPipeline` always has something to call.
//!
//! `InventoryCache` implementors must be `Send + Sync` so a single cache instance can be shared
//! across the threads operating on a repository. The [`Inventory`] values that flow through
//! `get`/`put`, however, use `Rc` internally (inherited from the manifest/state bimaps) and are
//! therefore `!Send`. That's fine: a cache hands a freshly cloned `Inventory` to whichever
//! thread called `get`, and that value never itself crosses a thread boundary -- only the cache
//! that stores and clones it needs to be shareable.

use crate::ocfl::inventory::Inventory;

/// Caches deserialized [`Inventory`] values, keyed by object ID, in front of an [`crate::ocfl::store::OcflStore`].
///
/// Implementors decide eviction policy, capacity, and storage; the engine only needs `get`,
/// `put`, and `invalidate`. [`crate::ocfl::commit::CommitPipeline`] invalidates an object's entry
/// as the last step of a commit, before releasing the object's write lock, so that a reader
/// acquiring the lock immediately afterward cannot observe a stale cached inventory.
pub trait InventoryCache: Send + Sync {
    /// Returns a clone of the cached inventory for `object_id`, if present.
    fn get(&self, object_id: &str) -> Option<Inventory>;

    /// Caches a clone of `inventory` under `object_id`, replacing any existing entry.
    fn put(&self, object_id: &str, inventory: &Inventory);

    /// Removes any cached entry for `object_id`.
    fn invalidate(&self, object_id: &str);
}

/// An `InventoryCache` that caches nothing. Every `get` misses; `put` and `invalidate` are no-ops.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl InventoryCache for NoopCache {
    fn get(&self, _object_id: &str) -> Option<Inventory> {
        None
    }

    fn put(&self, _object_id: &str, _inventory: &Inventory) {}

    fn invalidate(&self, _object_id: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_cache_never_returns_a_hit() {
        let cache = NoopCache;
        assert!(cache.get("urn:example:1").is_none());
        cache.invalidate("urn:example:1");
    }
}
