//! Pluggable 32-bit hashing for shard routing.
//!
//! The cache never caches a hasher across keys: [`HashFactory`] produces a
//! fresh, single-use [`Hasher32`] for every call to `Cache::shard_for`.

use std::sync::Arc;

/// A single-use, non-cryptographic 32-bit hasher.
///
/// Implementations are expected to be cheap to construct and to consume
/// their input exactly once; the shard router never calls `write` after
/// `finish32`, and never reuses an instance across keys.
pub trait Hasher32: Send {
    fn write(&mut self, bytes: &[u8]);
    fn finish32(&self) -> u32;
}

/// A factory producing a fresh [`Hasher32`] per call.
pub type HashFactory = Arc<dyn Fn() -> Box<dyn Hasher32> + Send + Sync>;

const FNV1_32_OFFSET_BASIS: u32 = 0x811c9dc5;
const FNV1_32_PRIME: u32 = 0x01000193;

/// The default hasher: 32-bit FNV-1 (not FNV-1a — multiply-then-xor, per
/// the classic algorithm spec.md's source contract assumes as default).
pub struct Fnv1Hasher32 {
    state: u32,
}

impl Default for Fnv1Hasher32 {
    fn default() -> Self {
        Self {
            state: FNV1_32_OFFSET_BASIS,
        }
    }
}

impl Hasher32 for Fnv1Hasher32 {
    fn write(&mut self, bytes: &[u8]) {
        let mut state = self.state;
        for &b in bytes {
            state = state.wrapping_mul(FNV1_32_PRIME);
            state ^= b as u32;
        }
        self.state = state;
    }

    fn finish32(&self) -> u32 {
        self.state
    }
}

/// Builds the default hash factory (fresh FNV-1 32-bit hasher per call).
pub fn default_hash_factory() -> HashFactory {
    Arc::new(|| Box::new(Fnv1Hasher32::default()) as Box<dyn Hasher32>)
}

/// Hashes `key` with a freshly constructed hasher from `factory`.
pub fn hash_key(factory: &HashFactory, key: &str) -> u32 {
    let mut hasher = factory();
    hasher.write(key.as_bytes());
    hasher.finish32()
}
