//! A high-concurrency, in-process key/value cache with per-entry
//! time-to-live, bounded per-shard capacity, and pluggable LRU/FIFO
//! eviction.
//!
//! The keyspace is partitioned across a fixed, power-of-two number of
//! independent shards so reads and writes to different keys never
//! contend on a shared lock. Expiration is lazy: an expired entry is
//! only ever removed the next time something touches it (a `get`, or a
//! capacity eviction), so there is no background sweeper thread.
//!
//! ```
//! use shardcache::Cache;
//!
//! let cache = Cache::new(None).unwrap();
//! cache.set("answer", 42i64, 0); // 0 = use the cache's default expiration
//! assert!(cache.get("answer").is_some());
//! ```
//!
//! This crate does not persist to disk, coordinate across processes, or
//! account for memory by byte size -- capacity is bounded by item count
//! per shard. See `SPEC_FULL.md` in the repository for the full design.

mod cache;
mod config;
mod error;
mod hash;
mod item;
mod list;
mod policy;
mod shard;
mod time;
mod value;

pub use cache::Cache;
pub use config::{Config, ConfigBuilder, Ttl, DEFAULT_EXPIRATION, NO_EXPIRATION};
pub use error::{CacheError, ConfigError};
pub use hash::{default_hash_factory, Fnv1Hasher32, HashFactory, Hasher32};
pub use item::ItemSnapshot;
pub use policy::EvictionPolicy;
pub use value::Value;
