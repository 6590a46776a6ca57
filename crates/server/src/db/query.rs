//! Vehicle record filters.
//!
//! A [`VehicleQuery`] is the small query surface the services need: an "in"
//! filter on lot IDs, range filters on entry and exit time, an open-only
//! filter and a newest-first ordering on entry time. Adapters translate it to SQL or
//! evaluate it with [`VehicleQuery::matches`].

use chrono::{DateTime, Utc};

use garagem_core::ParkingLotId;

use crate::models::Vehicle;

/// Upper bound of a [`TimeRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEnd {
    Inclusive(DateTime<Utc>),
    Exclusive(DateTime<Utc>),
}

/// A half-open or closed range on a timestamp column. Unset bounds are
/// unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<RangeEnd>,
}

impl TimeRange {
    /// Whether no bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Whether `at` lies within the range.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if self.from.is_some_and(|from| at < from) {
            return false;
        }
        match self.to {
            Some(RangeEnd::Inclusive(to)) => at <= to,
            Some(RangeEnd::Exclusive(to)) => at < to,
            None => true,
        }
    }
}

/// Filter over vehicle records.
///
/// An empty lot list matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleQuery {
    pub lots: Vec<ParkingLotId>,
    pub entry: TimeRange,
    /// Range on `exit_time`; any bound excludes open records.
    pub exit: TimeRange,
    /// Keep only records without an exit.
    pub only_open: bool,
    /// Sort by `entry_time` descending; unsorted otherwise.
    pub newest_first: bool,
}

impl VehicleQuery {
    /// Records of a single lot.
    #[must_use]
    pub fn in_lot(lot: ParkingLotId) -> Self {
        Self::in_lots(vec![lot])
    }

    /// Records of any of the given lots.
    #[must_use]
    pub fn in_lots(lots: Vec<ParkingLotId>) -> Self {
        Self {
            lots,
            entry: TimeRange::default(),
            exit: TimeRange::default(),
            only_open: false,
            newest_first: false,
        }
    }

    #[must_use]
    pub const fn entered_from(mut self, from: DateTime<Utc>) -> Self {
        self.entry.from = Some(from);
        self
    }

    #[must_use]
    pub const fn entered_until(mut self, to: DateTime<Utc>) -> Self {
        self.entry.to = Some(RangeEnd::Inclusive(to));
        self
    }

    #[must_use]
    pub const fn entered_before(mut self, to: DateTime<Utc>) -> Self {
        self.entry.to = Some(RangeEnd::Exclusive(to));
        self
    }

    #[must_use]
    pub const fn exited_from(mut self, from: DateTime<Utc>) -> Self {
        self.exit.from = Some(from);
        self
    }

    #[must_use]
    pub const fn open_only(mut self) -> Self {
        self.only_open = true;
        self
    }

    #[must_use]
    pub const fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    /// Evaluate the filter against one record.
    #[must_use]
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        if !self.lots.contains(&vehicle.parking_lot_id) {
            return false;
        }
        if !self.entry.contains(vehicle.entry_time) {
            return false;
        }
        if !self.exit.is_unbounded() {
            match vehicle.exit_time {
                Some(exit) if self.exit.contains(exit) => {}
                _ => return false,
            }
        }
        !self.only_open || vehicle.is_open()
    }
}
