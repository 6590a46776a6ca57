//! Length of a vehicle's stay.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Whole minutes a vehicle spent (or has spent so far) in a lot.
///
/// Displays as `"{hours}h {minutes}min"` using floor division, e.g. 125
/// minutes is `"2h 5min"`. Seconds are truncated, and a stay that would be
/// negative (clock skew) is clamped to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StayDuration {
    minutes: i64,
}

impl StayDuration {
    /// Build from a minute count.
    #[must_use]
    pub const fn from_minutes(minutes: i64) -> Self {
        Self {
            minutes: if minutes < 0 { 0 } else { minutes },
        }
    }

    /// Duration between entry and exit, using `now` for a vehicle still parked.
    #[must_use]
    pub fn between(entry: DateTime<Utc>, exit: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let end = exit.unwrap_or(now);
        Self::from_minutes((end - entry).num_minutes())
    }

    /// Total whole minutes.
    #[must_use]
    pub const fn total_minutes(self) -> i64 {
        self.minutes
    }

    /// Whole hours.
    #[must_use]
    pub const fn hours(self) -> i64 {
        self.minutes / 60
    }

    /// Minutes left over after the whole hours.
    #[must_use]
    pub const fn remaining_minutes(self) -> i64 {
        self.minutes % 60
    }
}

impl fmt::Display for StayDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}min", self.hours(), self.remaining_minutes())
    }
}

impl Serialize for StayDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    #[test]
    fn test_two_hours_five_minutes() {
        let entry = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        let exit = entry + TimeDelta::minutes(125);
        let stay = StayDuration::between(entry, Some(exit), entry);
        assert_eq!(stay.to_string(), "2h 5min");
    }

    #[test]
    fn test_open_stay_uses_now() {
        let entry = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        let now = entry + TimeDelta::minutes(59) + TimeDelta::seconds(59);
        assert_eq!(StayDuration::between(entry, None, now).to_string(), "0h 59min");
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        let entry = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        let before = entry - TimeDelta::minutes(3);
        assert_eq!(StayDuration::between(entry, Some(before), entry).total_minutes(), 0);
    }

    #[test]
    fn test_serializes_as_display_string() {
        let json = serde_json::to_string(&StayDuration::from_minutes(61)).unwrap();
        assert_eq!(json, "\"1h 1min\"");
    }
}
