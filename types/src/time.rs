//! Timestamps and the clock abstraction.
//!
//! Timestamps are Unix epoch seconds (UTC), the unit the poll contract uses
//! for `createdAt` and `endTime`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Current system time. A clock set before the epoch reads as the epoch.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds from `now` until this timestamp, zero if already passed.
    pub fn remaining_from(&self, now: Timestamp) -> u64 {
        self.0.saturating_sub(now.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of the current time.
///
/// The engine reads time only through this trait so tests can pin it.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Label for the time left until `end`: `"3h 20m remaining"`, `"45m remaining"`
/// or `"Ended"`.
pub fn format_remaining(end: Timestamp, now: Timestamp) -> String {
    let remaining = end.remaining_from(now);
    if remaining == 0 {
        return "Ended".to_string();
    }
    let hours = remaining / 3600;
    let minutes = (remaining % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m remaining")
    } else {
        format!("{minutes}m remaining")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_labels() {
        let now = Timestamp::new(1_000);
        assert_eq!(format_remaining(Timestamp::new(1_000), now), "Ended");
        assert_eq!(format_remaining(Timestamp::new(500), now), "Ended");
        assert_eq!(format_remaining(Timestamp::new(1_000 + 45 * 60), now), "45m remaining");
        assert_eq!(
            format_remaining(Timestamp::new(1_000 + 3 * 3600 + 20 * 60 + 5), now),
            "3h 20m remaining"
        );
        // Under a minute still counts as running.
        assert_eq!(format_remaining(Timestamp::new(1_030), now), "0m remaining");
    }

    #[test]
    fn plus_secs_saturates() {
        assert_eq!(Timestamp::new(u64::MAX).plus_secs(10), Timestamp::new(u64::MAX));
    }
}
