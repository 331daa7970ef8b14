//! Error types returned across the public surface.
//!
//! Errors are returned to the caller; the core never logs, retries, or
//! raises them out of band (spec.md §7). Lazy expiration is never an
//! error: an expired read just looks like a miss.

/// Fails cache construction.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("shard count {0} is not a power of two")]
    ShardCountNotPowerOfTwo(usize),
}

/// Fails `increment`/`decrement`.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("value for key `{key}` is not a number (type {type_name})")]
    NotANumber { key: String, type_name: &'static str },

    #[error("key `{key}` not found or expired")]
    NotFoundOrExpired { key: String },

    #[error("decrement would result in negative value for key `{key}`")]
    NegativeOverflow { key: String },

    /// Surfaced when the router's internal shard lookup cannot resolve a
    /// key (spec.md §7: "routing nil" fallback).
    #[error("key `{key}` not found")]
    KeyNotFound { key: String },
}
