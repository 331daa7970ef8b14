//! Nanosecond-since-epoch clock helper.
//!
//! The cache's expiration model is absolute nanosecond instants (spec.md
//! §3), not `std::time::Instant` deltas, so every TTL resolution and
//! expiry check goes through this single conversion point.

use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch, saturating rather than panicking if
/// the system clock is somehow set before 1970.
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
