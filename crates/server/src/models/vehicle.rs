//! Vehicle entry/exit records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use garagem_core::{ParkingLotId, Plate, StayDuration, VehicleId};

/// One stay of a vehicle in a lot.
///
/// Created open (`exit_time == None`) on entry; the exit is set exactly once.
/// At most one open record exists per `(plate, parking_lot_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub plate: Plate,
    pub driver: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub parking_lot_id: ParkingLotId,
}

impl Vehicle {
    /// Whether the vehicle is still parked.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    /// Length of the stay, measured up to `now` while still parked.
    #[must_use]
    pub fn stay(&self, now: DateTime<Utc>) -> StayDuration {
        StayDuration::between(self.entry_time, self.exit_time, now)
    }
}

/// A vehicle record joined with its lot name and formatted stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleReport {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub parking_lot_name: String,
    pub duration: StayDuration,
}

impl VehicleReport {
    /// Build the report row for `vehicle` as of `now`.
    #[must_use]
    pub fn new(vehicle: Vehicle, parking_lot_name: &str, now: DateTime<Utc>) -> Self {
        let duration = vehicle.stay(now);
        Self {
            vehicle,
            parking_lot_name: parking_lot_name.to_owned(),
            duration,
        }
    }
}

/// Autocomplete entry: a known plate and the driver of its latest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlateSuggestion {
    pub plate: Plate,
    pub driver: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    #[test]
    fn test_report_row_serializes_flat() {
        let entry = Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap();
        let vehicle = Vehicle {
            id: VehicleId::generate(),
            plate: Plate::parse("abc1d23").unwrap(),
            driver: "Maria".to_string(),
            entry_time: entry,
            exit_time: Some(entry + TimeDelta::minutes(95)),
            parking_lot_id: ParkingLotId::generate(),
        };

        let row = VehicleReport::new(vehicle, "Centro", entry);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["plate"], "ABC1D23");
        assert_eq!(json["parking_lot_name"], "Centro");
        assert_eq!(json["duration"], "1h 35min");
    }
}
