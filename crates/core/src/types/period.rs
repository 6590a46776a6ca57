//! Analytics period selector.

use core::fmt;

use chrono::{DateTime, FixedOffset, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::time::local_midnight;

/// Error returned for an unknown period name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown period {0:?} (expected today, week, month or year)")]
pub struct PeriodError(pub String);

/// A client-chosen window used to scope analytics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Since local midnight.
    #[default]
    Today,
    /// The last 7 days.
    Week,
    /// The last calendar month.
    Month,
    /// The last calendar year.
    Year,
}

impl Period {
    /// Start of the window ending at `now`.
    ///
    /// `Today` truncates to local midnight; the others subtract a week, a
    /// month or a year from `now` (month arithmetic clamps to the end of
    /// shorter months).
    #[must_use]
    pub fn start(self, now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
        match self {
            Self::Today => local_midnight(now, offset),
            Self::Week => now - TimeDelta::days(7),
            Self::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            Self::Year => now
                .checked_sub_months(Months::new(12))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Lowercase name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(PeriodError(s.to_owned())),
        }
    }
}
