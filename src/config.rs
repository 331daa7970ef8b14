//! Cache construction configuration.
//!
//! Fields are validated/defaulted at construction per spec.md §4.1's
//! table: most malformed input is silently defaulted, only a
//! non-power-of-two shard count is a hard construction failure.

use crate::error::ConfigError;
use crate::hash::{default_hash_factory, HashFactory};

/// A signed nanosecond TTL. `0` means "use the cache's default
/// expiration", `-1` means "never expires", any positive value is a
/// relative TTL in nanoseconds from the moment of the call.
pub type Ttl = i64;

/// `set`'s sentinel for "use the cache's configured default expiration".
pub const DEFAULT_EXPIRATION: Ttl = 0;
/// `set`'s sentinel for "never expires".
pub const NO_EXPIRATION: Ttl = -1;

const DEFAULT_SHARD_COUNT: usize = 512;
const DEFAULT_MAX_SHARD_SIZE: usize = 1000;

/// Construction-time configuration for a [`crate::Cache`].
///
/// Build with [`Config::builder`], or use [`Config::default`] to get the
/// same defaults `Cache::new(None)` would apply.
pub struct Config {
    pub shard_count: usize,
    pub max_shard_size: usize,
    pub default_expiration: Ttl,
    pub hash_factory: HashFactory,
    pub eviction_policy: String,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            shard_count: self.shard_count,
            max_shard_size: self.max_shard_size,
            default_expiration: self.default_expiration,
            hash_factory: self.hash_factory.clone(),
            eviction_policy: self.eviction_policy.clone(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("shard_count", &self.shard_count)
            .field("max_shard_size", &self.max_shard_size)
            .field("default_expiration", &self.default_expiration)
            .field("hash_factory", &"<fn>")
            .field("eviction_policy", &self.eviction_policy)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            max_shard_size: DEFAULT_MAX_SHARD_SIZE,
            default_expiration: DEFAULT_EXPIRATION,
            hash_factory: default_hash_factory(),
            eviction_policy: "LRU".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Applies spec.md §4.1's defaulting rules and validates the result.
    /// Returns the normalized `(shard_count, max_shard_size,
    /// default_expiration)` triple plus the parsed policy, or
    /// [`ConfigError::ShardCountNotPowerOfTwo`] if the shard count (after
    /// defaulting) isn't a power of two.
    pub(crate) fn normalize(&self) -> Result<NormalizedConfig, ConfigError> {
        let mut shard_count = self.shard_count;
        if shard_count == 0 {
            tracing::warn!(default = DEFAULT_SHARD_COUNT, "shard_count <= 0, defaulting");
            shard_count = DEFAULT_SHARD_COUNT;
        }
        if !shard_count.is_power_of_two() {
            return Err(ConfigError::ShardCountNotPowerOfTwo(shard_count));
        }

        let max_shard_size = if self.max_shard_size == 0 {
            tracing::warn!(
                default = DEFAULT_MAX_SHARD_SIZE,
                "max_shard_size <= 0, defaulting"
            );
            DEFAULT_MAX_SHARD_SIZE
        } else {
            self.max_shard_size
        };

        // A negative default expiration other than NO_EXPIRATION's -1
        // collapses to "use default-of-default" per spec.md §4.1's table
        // ("< -1 duration" is malformed input, silently defaulted).
        let default_expiration = if self.default_expiration < NO_EXPIRATION {
            tracing::warn!(
                requested = self.default_expiration,
                "default_expiration < -1, defaulting to 0"
            );
            DEFAULT_EXPIRATION
        } else {
            self.default_expiration
        };

        let eviction_policy = crate::policy::EvictionPolicy::parse(&self.eviction_policy);
        if self.eviction_policy.is_empty() {
            tracing::warn!("eviction_policy empty, defaulting to LRU");
        } else if eviction_policy == crate::policy::EvictionPolicy::Unknown {
            tracing::warn!(
                policy = %self.eviction_policy,
                "unrecognized eviction_policy; get will never return a hit"
            );
        }

        Ok(NormalizedConfig {
            shard_count,
            max_shard_size,
            default_expiration,
            hash_factory: self.hash_factory.clone(),
            eviction_policy,
        })
    }
}

pub(crate) struct NormalizedConfig {
    pub shard_count: usize,
    pub max_shard_size: usize,
    pub default_expiration: Ttl,
    pub hash_factory: HashFactory,
    pub eviction_policy: crate::policy::EvictionPolicy,
}

/// Chainable builder for [`Config`].
#[derive(Default)]
pub struct ConfigBuilder {
    inner: PartialConfig,
}

#[derive(Default)]
struct PartialConfig {
    shard_count: Option<usize>,
    max_shard_size: Option<usize>,
    default_expiration: Option<Ttl>,
    hash_factory: Option<HashFactory>,
    eviction_policy: Option<String>,
}

impl ConfigBuilder {
    pub fn shard_count(mut self, n: usize) -> Self {
        self.inner.shard_count = Some(n);
        self
    }

    pub fn max_shard_size(mut self, n: usize) -> Self {
        self.inner.max_shard_size = Some(n);
        self
    }

    pub fn default_expiration(mut self, ttl: Ttl) -> Self {
        self.inner.default_expiration = Some(ttl);
        self
    }

    pub fn hash_factory(mut self, factory: HashFactory) -> Self {
        self.inner.hash_factory = Some(factory);
        self
    }

    pub fn eviction_policy(mut self, policy: impl Into<String>) -> Self {
        self.inner.eviction_policy = Some(policy.into());
        self
    }

    pub fn build(self) -> Config {
        let defaults = Config::default();
        Config {
            shard_count: self.inner.shard_count.unwrap_or(defaults.shard_count),
            max_shard_size: self.inner.max_shard_size.unwrap_or(defaults.max_shard_size),
            default_expiration: self
                .inner
                .default_expiration
                .unwrap_or(defaults.default_expiration),
            hash_factory: self.inner.hash_factory.unwrap_or(defaults.hash_factory),
            eviction_policy: self.inner.eviction_policy.unwrap_or(defaults.eviction_policy),
        }
    }
}
