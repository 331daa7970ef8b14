//! A single shard: map + ordering list + lock, owning a slice of the
//! keyspace independent of every other shard (spec.md §4.2–§4.6).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Ttl;
use crate::error::CacheError;
use crate::item::{Item, ItemSnapshot, NEVER_EXPIRES};
use crate::list::OrderList;
use crate::policy::EvictionPolicy;
use crate::time::now_nanos;
use crate::value::Value;

/// A user-supplied eviction callback, shared by every shard through an
/// `Arc` so installing/replacing it doesn't require touching each shard
/// (spec.md §3's `cache_ref`, §5's callback-pointer lock).
pub(crate) type OnEvicted = dyn Fn(&str, &Value) + Send + Sync;

pub(crate) struct CallbackSlot {
    callback: RwLock<Option<Arc<OnEvicted>>>,
}

impl CallbackSlot {
    pub fn new() -> Self {
        Self {
            callback: RwLock::new(None),
        }
    }

    pub fn set(&self, callback: Arc<OnEvicted>) {
        *self.callback.write() = Some(callback);
    }

    /// Invokes the currently installed callback, if any, with `(key,
    /// value)`. Called while the evicting shard's write lock is held
    /// (spec.md §5): the callback must not call back into the *same*
    /// shard, but may safely route to any other shard.
    fn invoke(&self, key: &str, value: &Value) {
        if let Some(callback) = self.callback.read().as_ref() {
            callback(key, value);
        }
    }
}

/// Resolves a requested TTL to an absolute expiration instant, per
/// spec.md §4.2's table. `ttl == 0` means "use the configured default";
/// `ttl < 0` means "never expires"; `ttl > 0` is relative nanoseconds
/// from `now`. The default itself is resolved with the same two special
/// cases, so a cache configured with `default_expiration == 0` (the
/// unconfigured default) makes `ttl == 0` items never expire too --
/// spec.md §9's documented `ttl`/`DEFAULT_EXPIRATION` collision.
pub(crate) fn resolve_expiration(ttl: Ttl, default_expiration: Ttl, now: i64) -> i64 {
    if ttl > 0 {
        now + ttl
    } else if ttl < 0 {
        NEVER_EXPIRES
    } else if default_expiration > 0 {
        now + default_expiration
    } else {
        NEVER_EXPIRES
    }
}

struct ShardData {
    items: HashMap<String, Item>,
    order: OrderList,
    size: usize,
}

/// An independent, lockable partition of the cache's keyspace.
pub(crate) struct Shard {
    data: RwLock<ShardData>,
    max_size: usize,
    policy: EvictionPolicy,
    callbacks: Arc<CallbackSlot>,
}

impl Shard {
    pub fn new(max_size: usize, policy: EvictionPolicy, callbacks: Arc<CallbackSlot>) -> Self {
        Self {
            data: RwLock::new(ShardData {
                items: HashMap::new(),
                order: OrderList::new(),
                size: 0,
            }),
            max_size,
            policy,
            callbacks,
        }
    }

    /// Inserts or overwrites `key`. Overwriting never invokes the
    /// eviction callback (spec.md §4.2); a new insertion may trigger one
    /// or more capacity evictions, each of which does.
    pub fn set(&self, key: &str, value: Value, ttl: Ttl, default_expiration: Ttl) {
        let now = now_nanos();
        let expiration = resolve_expiration(ttl, default_expiration, now);
        let mut data = self.data.write();

        if let Some(existing) = data.items.get_mut(key) {
            existing.value = value;
            existing.expiration = expiration;
            data.order.move_to_front(key);
            return;
        }

        data.items
            .insert(key.to_string(), Item::new(value, expiration));
        data.order.push_front(key.to_string());
        data.size += 1;

        while data.size > self.max_size {
            self.evict_oldest(&mut data);
        }
    }

    fn evict_oldest(&self, data: &mut ShardData) {
        let Some(victim_key) = data.order.pop_back() else {
            return;
        };
        if let Some(item) = data.items.remove(&victim_key) {
            data.size -= 1;
            self.callbacks.invoke(&victim_key, &item.value);
        }
    }

    /// The shared read path for `get`/`get_with_expiration`/`item`.
    /// Returns `None` under an unrecognized policy, on a miss, or on a
    /// lazily discovered expiry (which also removes the entry and fires
    /// the eviction callback). Promotes to the front of the ordering
    /// list under LRU; never promotes under FIFO.
    fn get_core(&self, key: &str) -> Option<(Value, i64)> {
        match self.policy {
            EvictionPolicy::Unknown => None,
            EvictionPolicy::Lru => self.get_core_lru(key),
            EvictionPolicy::Fifo => self.get_core_fifo(key),
        }
    }

    fn get_core_lru(&self, key: &str) -> Option<(Value, i64)> {
        let now = now_nanos();
        let mut data = self.data.write();

        let expired = data.items.get(key)?.is_expired(now);
        if expired {
            self.remove_locked(&mut data, key);
            return None;
        }

        data.order.move_to_front(key);
        let item = data.items.get(key).expect("just promoted");
        Some((item.value.clone(), item.expiration))
    }

    fn get_core_fifo(&self, key: &str) -> Option<(Value, i64)> {
        let now = now_nanos();
        {
            let data = self.data.read();
            match data.items.get(key) {
                None => return None,
                Some(item) if !item.is_expired(now) => {
                    return Some((item.value.clone(), item.expiration));
                }
                Some(_) => {}
            }
        }

        let mut data = self.data.write();
        self.remove_locked(&mut data, key);
        None
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_core(key).map(|(value, _)| value)
    }

    pub fn get_with_expiration(&self, key: &str) -> (Option<Value>, i64) {
        match self.get_core(key) {
            Some((value, expiration)) => (Some(value), expiration),
            None => (None, 0),
        }
    }

    pub fn item(&self, key: &str) -> Option<ItemSnapshot> {
        self.get_core(key)
            .map(|(value, expiration)| ItemSnapshot { value, expiration })
    }

    /// Removes `key` from the map/list/size bookkeeping while already
    /// holding the write lock, without invoking the eviction callback.
    /// Returns the removed item, if any.
    fn remove_locked_silent(&self, data: &mut ShardData, key: &str) -> Option<Item> {
        let item = data.items.remove(key)?;
        data.order.remove(key);
        data.size -= 1;
        Some(item)
    }

    /// Removes `key` while already holding the write lock. Invokes the
    /// eviction callback if the key was present (manual delete, capacity
    /// eviction, or lazy expiration discovered by `get` -- spec.md §4.5).
    /// Returns whether it was.
    fn remove_locked(&self, data: &mut ShardData, key: &str) -> bool {
        match self.remove_locked_silent(data, key) {
            Some(item) => {
                self.callbacks.invoke(key, &item.value);
                true
            }
            None => false,
        }
    }

    pub fn delete(&self, key: &str) {
        let mut data = self.data.write();
        self.remove_locked(&mut data, key);
    }

    pub fn increment(&self, key: &str, delta: i64) -> Result<(), CacheError> {
        self.mutate_numeric(key, delta, Value::increment)
    }

    pub fn decrement(&self, key: &str, delta: i64) -> Result<(), CacheError> {
        self.mutate_numeric(key, delta, Value::decrement)
    }

    fn mutate_numeric(
        &self,
        key: &str,
        delta: i64,
        op: impl FnOnce(&mut Value, &str, i64) -> Result<(), CacheError>,
    ) -> Result<(), CacheError> {
        let now = now_nanos();
        let mut data = self.data.write();

        let expired = match data.items.get(key) {
            None => {
                return Err(CacheError::NotFoundOrExpired {
                    key: key.to_string(),
                })
            }
            Some(item) => item.is_expired(now),
        };
        if expired {
            // Stale bookkeeping cleanup only -- spec.md §4.5/§8 attribute
            // the eviction callback's lazy-expiration firing to `get`
            // alone, not to increment/decrement.
            self.remove_locked_silent(&mut data, key);
            return Err(CacheError::NotFoundOrExpired {
                key: key.to_string(),
            });
        }

        let item = data.items.get_mut(key).expect("checked present above");
        op(&mut item.value, key, delta)
    }

    pub fn clear(&self) {
        let mut data = self.data.write();
        data.items = HashMap::new();
        data.order.clear();
        data.size = 0;
    }

    pub fn count(&self) -> usize {
        self.data.read().size
    }

    /// A snapshot of unexpired `(key, value)` pairs. Expired entries are
    /// filtered out but not removed (spec.md §4.6, §9: lazy expiration is
    /// deliberately not performed here).
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let now = now_nanos();
        let data = self.data.read();
        data.items
            .iter()
            .filter(|(_, item)| !item.is_expired(now))
            .map(|(k, item)| (k.clone(), item.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(max_size: usize, policy: EvictionPolicy) -> Shard {
        Shard::new(max_size, policy, Arc::new(CallbackSlot::new()))
    }

    #[test]
    fn miss_on_absent_key() {
        let s = shard(10, EvictionPolicy::Lru);
        assert!(s.get("nope").is_none());
        assert_eq!(s.get_with_expiration("nope"), (None, 0));
    }

    #[test]
    fn round_trip_set_then_get() {
        let s = shard(10, EvictionPolicy::Lru);
        s.set("a", Value::from(1i64), 0, 0);
        assert!(matches!(s.get("a"), Some(Value::I64(1))));
    }

    #[test]
    fn never_expires_when_ttl_is_negative() {
        let s = shard(10, EvictionPolicy::Lru);
        s.set("a", Value::from(1i64), crate::config::NO_EXPIRATION, 0);
        let (_, expiration) = s.get_with_expiration("a");
        assert_eq!(expiration, 0);
    }

    #[test]
    fn capacity_bound_holds_under_lru() {
        let s = shard(3, EvictionPolicy::Lru);
        for i in 0..10 {
            s.set(&format!("k{i}"), Value::from(i as i64), 0, 0);
        }
        assert!(s.count() <= 3);
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let s = shard(3, EvictionPolicy::Lru);
        s.set("a", Value::from(1i64), 0, 0);
        s.set("b", Value::from(2i64), 0, 0);
        s.set("c", Value::from(3i64), 0, 0);

        // Touch "a" so it's no longer the least recently used.
        assert!(s.get("a").is_some());

        s.set("d", Value::from(4i64), 0, 0);

        assert!(s.get("b").is_none(), "b should have been evicted");
        assert!(s.get("a").is_some());
        assert!(s.get("c").is_some());
        assert!(s.get("d").is_some());
    }

    #[test]
    fn fifo_evicts_earliest_insertion_regardless_of_gets() {
        let s = shard(3, EvictionPolicy::Fifo);
        s.set("a", Value::from(1i64), 0, 0);
        s.set("b", Value::from(2i64), 0, 0);
        s.set("c", Value::from(3i64), 0, 0);

        // Touching "a" must not save it from eviction under FIFO.
        assert!(s.get("a").is_some());

        s.set("d", Value::from(4i64), 0, 0);

        assert!(s.get("a").is_none(), "a should have been evicted");
        assert!(s.get("b").is_some());
        assert!(s.get("c").is_some());
        assert!(s.get("d").is_some());
    }

    #[test]
    fn unknown_policy_never_hits() {
        let s = shard(3, EvictionPolicy::Unknown);
        s.set("a", Value::from(1i64), 0, 0);
        assert!(s.get("a").is_none());
        assert_eq!(s.get_with_expiration("a"), (None, 0));
    }

    #[test]
    fn overwrite_does_not_invoke_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let slot = Arc::new(CallbackSlot::new());
        {
            let calls = calls.clone();
            slot.set(Arc::new(move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }
        let s = Shard::new(10, EvictionPolicy::Lru, slot);
        s.set("a", Value::from(1i64), 0, 0);
        s.set("a", Value::from(2i64), 0, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(s.get("a"), Some(Value::I64(2))));
    }

    #[test]
    fn delete_invokes_callback_exactly_once_for_present_key() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let slot = Arc::new(CallbackSlot::new());
        {
            let calls = calls.clone();
            slot.set(Arc::new(move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }
        let s = Shard::new(10, EvictionPolicy::Lru, slot);
        s.set("a", Value::from(1i64), 0, 0);
        s.delete("a");
        s.delete("a"); // no-op, absent
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_does_not_invoke_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let slot = Arc::new(CallbackSlot::new());
        {
            let calls = calls.clone();
            slot.set(Arc::new(move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }
        let s = Shard::new(10, EvictionPolicy::Lru, slot);
        s.set("a", Value::from(1i64), 0, 0);
        s.set("b", Value::from(2i64), 0, 0);
        s.clear();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(s.count(), 0);
    }

    #[test]
    fn item_count_identity() {
        let s = shard(100, EvictionPolicy::Lru);
        for i in 0..5 {
            s.set(&format!("k{i}"), Value::from(i as i64), 0, 0);
        }
        assert_eq!(s.count(), 5);
        s.delete("k0");
        assert_eq!(s.count(), 4);
    }

    #[test]
    fn snapshot_filters_expired_but_leaves_them_in_place() {
        let s = shard(10, EvictionPolicy::Lru);
        s.set("a", Value::from(1i64), 1, 0); // 1ns TTL, expires almost immediately
        std::thread::sleep(std::time::Duration::from_millis(5));
        s.set("b", Value::from(2i64), 0, 0);

        let snap = s.snapshot();
        assert!(!snap.contains_key("a"));
        assert!(snap.contains_key("b"));
        // Still counted until a read or explicit removal touches it.
        assert_eq!(s.count(), 2);
    }

    #[test]
    fn increment_errors_on_absent_key() {
        let s = shard(10, EvictionPolicy::Lru);
        let err = s.increment("nope", 1).unwrap_err();
        assert!(matches!(err, CacheError::NotFoundOrExpired { .. }));
    }

    #[test]
    fn increment_wraps_int8() {
        let s = shard(10, EvictionPolicy::Lru);
        s.set("int8", Value::from(127i8), 0, 0);
        s.increment("int8", 1).unwrap();
        assert!(matches!(s.get("int8"), Some(Value::I8(-128))));
    }

    #[test]
    fn decrement_unsigned_underflow_leaves_value_unchanged() {
        let s = shard(10, EvictionPolicy::Lru);
        s.set("u", Value::from(0u8), 0, 0);
        let err = s.decrement("u", 1).unwrap_err();
        assert!(matches!(err, CacheError::NegativeOverflow { .. }));
        assert!(matches!(s.get("u"), Some(Value::U8(0))));
    }

    #[test]
    fn increment_on_expired_key_does_not_invoke_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let slot = Arc::new(CallbackSlot::new());
        {
            let calls = calls.clone();
            slot.set(Arc::new(move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }
        let s = Shard::new(10, EvictionPolicy::Lru, slot);
        s.set("a", Value::from(1i64), 1, 0); // 1ns TTL, expires almost immediately
        std::thread::sleep(std::time::Duration::from_millis(5));

        let err = s.increment("a", 1).unwrap_err();
        assert!(matches!(err, CacheError::NotFoundOrExpired { .. }));
        assert_eq!(
            calls.load(Ordering::SeqCst),
            0,
            "only get's lazy expiration fires the eviction callback, not increment/decrement"
        );

        let err = s.decrement("a", 1).unwrap_err();
        assert!(matches!(err, CacheError::NotFoundOrExpired { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
