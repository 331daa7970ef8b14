//! The shard router: the single public entry point into the cache.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Config, Ttl};
use crate::error::{CacheError, ConfigError};
use crate::hash::hash_key;
use crate::item::ItemSnapshot;
use crate::shard::{CallbackSlot, Shard};
use crate::value::Value;

/// A sharded, in-process key/value cache with per-entry TTL, bounded
/// per-shard capacity, and pluggable LRU/FIFO eviction.
///
/// Every operation routes to exactly one shard by hashing the key; no
/// operation crosses shards except the bulk routines (`item_count`,
/// `items`, `flush`), which iterate shards sequentially and never hold
/// more than one shard's lock at a time (spec.md §5).
pub struct Cache {
    shards: Vec<Shard>,
    shard_mask: u32,
    hash_factory: crate::hash::HashFactory,
    default_expiration: Ttl,
    callbacks: Arc<CallbackSlot>,
}

impl Cache {
    /// Builds a cache from `config`, or from [`Config::default`] when
    /// `None`. Fails only when the (possibly defaulted) shard count is
    /// not a power of two; every other malformed field is silently
    /// defaulted per spec.md §4.1's table.
    pub fn new(config: Option<Config>) -> Result<Self, ConfigError> {
        let config = config.unwrap_or_default();
        let normalized = config.normalize()?;

        let callbacks = Arc::new(CallbackSlot::new());
        let shards = (0..normalized.shard_count)
            .map(|_| {
                Shard::new(
                    normalized.max_shard_size,
                    normalized.eviction_policy,
                    callbacks.clone(),
                )
            })
            .collect();

        tracing::debug!(
            shard_count = normalized.shard_count,
            max_shard_size = normalized.max_shard_size,
            policy = ?normalized.eviction_policy,
            "cache constructed"
        );

        Ok(Self {
            shards,
            shard_mask: (normalized.shard_count - 1) as u32,
            hash_factory: normalized.hash_factory,
            default_expiration: normalized.default_expiration,
            callbacks,
        })
    }

    fn shard_for(&self, key: &str) -> &Shard {
        let digest = hash_key(&self.hash_factory, key);
        let index = (digest & self.shard_mask) as usize;
        &self.shards[index]
    }

    /// Fire-and-forget insert or overwrite. `ttl` follows spec.md §4.2's
    /// resolution table; pass [`crate::config::DEFAULT_EXPIRATION`] or
    /// [`crate::config::NO_EXPIRATION`] for the two named sentinels.
    pub fn set(&self, key: &str, value: impl Into<Value>, ttl: Ttl) {
        self.shard_for(key)
            .set(key, value.into(), ttl, self.default_expiration);
    }

    /// Looks up `key`. Absent when missing or expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.shard_for(key).get(key)
    }

    /// No-op if `key` is absent.
    pub fn delete(&self, key: &str) {
        self.shard_for(key).delete(key);
    }

    /// Like [`Cache::get`], but also returns the absolute expiration
    /// instant (nanoseconds since the Unix epoch; `0` means never
    /// expires). Returns `(None, 0)` when absent.
    pub fn get_with_expiration(&self, key: &str) -> (Option<Value>, i64) {
        self.shard_for(key).get_with_expiration(key)
    }

    /// Exposes the raw item record, including its absolute expiration
    /// nanoseconds.
    pub fn item(&self, key: &str) -> Option<ItemSnapshot> {
        self.shard_for(key).item(key)
    }

    /// The sum of every shard's item count. Acquires each shard's read
    /// lock in turn; never holds more than one at a time.
    pub fn item_count(&self) -> usize {
        self.shards.iter().map(Shard::count).sum()
    }

    /// A merged snapshot of unexpired `(key, value)` pairs across every
    /// shard. Expired entries are filtered out, not lazily removed
    /// (spec.md §9).
    pub fn items(&self) -> HashMap<String, Value> {
        let mut merged = HashMap::new();
        for shard in &self.shards {
            merged.extend(shard.snapshot());
        }
        merged
    }

    /// Adds `delta` to the numeric value stored under `key`, wrapping
    /// per the stored type's natural modular arithmetic. Errors if the
    /// key is absent/expired or the stored value isn't numeric.
    pub fn increment(&self, key: &str, delta: i64) -> Result<(), CacheError> {
        self.shard_for(key).increment(key, delta)
    }

    /// Subtracts `delta` from the numeric value stored under `key`. For
    /// unsigned stored types, fails without mutating if `delta` exceeds
    /// the current value.
    pub fn decrement(&self, key: &str, delta: i64) -> Result<(), CacheError> {
        self.shard_for(key).decrement(key, delta)
    }

    /// Clears every shard. Never invokes the eviction callback.
    pub fn flush(&self) {
        for shard in &self.shards {
            shard.clear();
        }
    }

    /// Installs or replaces the eviction callback. Thread-safe via the
    /// router's own lock around the callback pointer (spec.md §5); data
    /// plane operations never acquire this lock directly.
    ///
    /// The callback fires on manual delete, capacity eviction, and lazy
    /// expiration discovered during a read -- never on overwrite via
    /// `set` or on `flush`. It runs while the evicting shard's write
    /// lock is held, so it must not call back into the *same* shard, but
    /// may safely call into the cache for any key that routes elsewhere.
    pub fn on_evicted(&self, callback: impl Fn(&str, &Value) + Send + Sync + 'static) {
        tracing::debug!("eviction callback installed");
        self.callbacks.set(Arc::new(callback));
    }
}
