//! Wall-clock helpers shared by the periodic services.

use std::time::{SystemTime, UNIX_EPOCH};

/// Unix time in nanoseconds. Clamped to zero before the epoch.
pub(crate) fn unix_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}

pub(crate) fn unix_millis() -> i64 {
    unix_nanos() / 1_000_000
}
