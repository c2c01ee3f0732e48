//! Time-related utilities with clock abstraction for testability.
//!
//! Timestamps are Unix epoch milliseconds (UTC). Rendering for humans takes an
//! explicit UTC offset in minutes; the relay defaults to JST (+09:00).

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// JST offset in minutes, used as the default display offset.
pub const JST_OFFSET_MINUTES: i32 = 9 * 60;

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp (milliseconds)
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        current_timestamp_millis()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time
    }
}

/// Get current Unix timestamp (milliseconds)
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Build a display offset from minutes east of UTC.
///
/// Out-of-range offsets (beyond ±24h) fall back to UTC.
pub fn display_offset(offset_minutes: i32) -> FixedOffset {
    offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

fn to_offset_datetime(timestamp_millis: i64, offset_minutes: i32) -> DateTime<FixedOffset> {
    let offset = display_offset(offset_minutes);
    let utc = DateTime::<Utc>::from_timestamp_millis(timestamp_millis).unwrap_or_default();
    utc.with_timezone(&offset)
}

/// Convert Unix timestamp (milliseconds) to RFC 3339 in the given offset
pub fn timestamp_to_rfc3339(timestamp_millis: i64, offset_minutes: i32) -> String {
    to_offset_datetime(timestamp_millis, offset_minutes).to_rfc3339()
}

/// Render a Unix timestamp (milliseconds) as `HH:MM` in the given offset
pub fn timestamp_to_hh_mm(timestamp_millis: i64, offset_minutes: i32) -> String {
    to_offset_datetime(timestamp_millis, offset_minutes)
        .format("%H:%M")
        .to_string()
}
