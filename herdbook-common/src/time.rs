//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds elapsed since `start`, clamped at zero
pub fn elapsed_ms(start: DateTime<Utc>) -> u64 {
    (now() - start).num_milliseconds().max(0) as u64
}
