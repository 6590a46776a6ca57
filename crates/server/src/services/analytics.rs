//! Dashboard analytics.
//!
//! Every view is computed from one fetch of the relevant records followed
//! by in-process bucketing, so a dashboard costs a handful of queries no
//! matter how many buckets it renders.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, TimeDelta, Timelike, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use garagem_core::{ParkingLotId, Period, WEEKDAY_LABELS, local_midnight, weekday_index};

use super::ServiceError;
use crate::clock::Clock;
use crate::db::{RecordStore, VehicleQuery};
use crate::models::{ParkingLot, Vehicle};

/// Number of hourly buckets in the movement view.
pub const HOURLY_BUCKETS: usize = 24;

/// Movement within one local hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyBucket {
    /// `"{H}h"` in local time.
    pub label: String,
    pub start: DateTime<Utc>,
    /// Records that entered during the hour.
    pub entries: u64,
    /// Of those entries, how many have left by now.
    pub entries_exited: u64,
    /// Records whose exit falls within the hour.
    pub exits: u64,
}

/// Vehicles currently parked in one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotOccupancy {
    pub parking_lot_id: ParkingLotId,
    pub name: String,
    pub value: u64,
}

/// Entries today against entries yesterday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayOverDay {
    pub today: u64,
    pub yesterday: u64,
    /// Rounded percentage change; 100 when yesterday had no entries.
    pub delta_percent: i64,
}

/// Entries per local weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayBucket {
    pub label: &'static str,
    pub value: u64,
}

/// Average stay of closed records per local weekday of entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayStay {
    pub label: &'static str,
    /// Whole minutes; 0 when there were no closed records.
    pub average_minutes: i64,
    pub samples: u64,
}

/// Every dashboard view for a set of lots and a period.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub period: Period,
    pub period_start: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    /// Client token echoed back so stale responses can be dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
    pub lots: Vec<ParkingLotId>,
    pub hourly: Vec<HourlyBucket>,
    pub occupancy: Vec<LotOccupancy>,
    pub day_over_day: DayOverDay,
    pub weekday: Vec<WeekdayBucket>,
    pub period_total: u64,
    pub average_stay: Vec<WeekdayStay>,
}

/// Computes dashboard views over the record store.
pub struct AnalyticsAggregator<'a> {
    store: &'a dyn RecordStore,
    clock: &'a dyn Clock,
    offset: FixedOffset,
}

impl<'a> AnalyticsAggregator<'a> {
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, clock: &'a dyn Clock, offset: FixedOffset) -> Self {
        Self {
            store,
            clock,
            offset,
        }
    }

    /// Build every view for `lots`, which the caller has already checked
    /// for access.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` if the store fails.
    #[instrument(skip(self, lots), fields(lot_count = lots.len(), period = %period))]
    pub async fn dashboard(
        &self,
        lots: &[ParkingLot],
        period: Period,
        generation: Option<u64>,
    ) -> Result<Dashboard, ServiceError> {
        let now = self.clock.now();
        let ids: Vec<ParkingLotId> = lots.iter().map(|l| l.id).collect();
        let period_start = period.start(now, self.offset);

        let hourly = self.hourly_movement(&ids, now).await?;
        let occupancy = self.occupancy(lots).await?;
        let day_over_day = self.day_over_day(&ids, now).await?;

        let in_period = self
            .store
            .find_vehicles(
                &VehicleQuery::in_lots(ids.clone())
                    .entered_from(period_start)
                    .entered_until(now),
            )
            .await?;
        let weekday = bucket_weekdays(&in_period, self.offset);
        let average_stay = average_stay_by_weekday(&in_period, self.offset);
        let period_total = u64::try_from(in_period.len()).unwrap_or(u64::MAX);

        debug!(period_total, "Dashboard computed");

        Ok(Dashboard {
            period,
            period_start,
            generated_at: now,
            generation,
            lots: ids,
            hourly,
            occupancy,
            day_over_day,
            weekday,
            period_total,
            average_stay,
        })
    }

    /// Entries and exits in the 24 local hours ending with the current one.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` if the store fails.
    pub async fn hourly_movement(
        &self,
        lots: &[ParkingLotId],
        now: DateTime<Utc>,
    ) -> Result<Vec<HourlyBucket>, ServiceError> {
        let window_start = hourly_window_start(now, self.offset);
        let entered = self
            .store
            .find_vehicles(&VehicleQuery::in_lots(lots.to_vec()).entered_from(window_start))
            .await?;
        let exited = self
            .store
            .find_vehicles(&VehicleQuery::in_lots(lots.to_vec()).exited_from(window_start))
            .await?;
        Ok(bucket_hourly(window_start, self.offset, &entered, &exited, now))
    }

    /// Open records per lot, one entry per lot in the order of `lots`.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` if the store fails.
    pub async fn occupancy(
        &self,
        lots: &[ParkingLot],
    ) -> Result<Vec<LotOccupancy>, ServiceError> {
        let ids: Vec<ParkingLotId> = lots.iter().map(|l| l.id).collect();
        let open = self
            .store
            .find_vehicles(&VehicleQuery::in_lots(ids).open_only())
            .await?;

        let mut counts: HashMap<ParkingLotId, u64> = HashMap::new();
        for v in &open {
            *counts.entry(v.parking_lot_id).or_default() += 1;
        }

        Ok(lots
            .iter()
            .map(|lot| LotOccupancy {
                parking_lot_id: lot.id,
                name: lot.display_name().to_owned(),
                value: counts.get(&lot.id).copied().unwrap_or(0),
            })
            .collect())
    }

    /// Entries since local midnight against the previous local day.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` if the store fails.
    pub async fn day_over_day(
        &self,
        lots: &[ParkingLotId],
        now: DateTime<Utc>,
    ) -> Result<DayOverDay, ServiceError> {
        let midnight = local_midnight(now, self.offset);
        let today = self
            .store
            .count_vehicles(&VehicleQuery::in_lots(lots.to_vec()).entered_from(midnight))
            .await?;
        let yesterday = self
            .store
            .count_vehicles(
                &VehicleQuery::in_lots(lots.to_vec())
                    .entered_from(midnight - TimeDelta::days(1))
                    .entered_before(midnight),
            )
            .await?;

        Ok(DayOverDay {
            today,
            yesterday,
            delta_percent: percentage_delta(today, yesterday),
        })
    }
}

// =============================================================================
// Bucketing
// =============================================================================

/// Start of the oldest hourly bucket: the current local hour minus 23 hours.
#[must_use]
pub fn hourly_window_start(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset);
    let into_hour = TimeDelta::seconds(i64::from(local.minute() * 60 + local.second()))
        + TimeDelta::nanoseconds(i64::from(local.nanosecond()));
    now - into_hour - TimeDelta::hours(23)
}

fn hour_slot(at: DateTime<Utc>, window_start: DateTime<Utc>) -> Option<usize> {
    if at < window_start {
        return None;
    }
    usize::try_from((at - window_start).num_hours())
        .ok()
        .filter(|&slot| slot < HOURLY_BUCKETS)
}

/// Spread records over 24 one-hour buckets starting at `window_start`,
/// oldest first.
#[must_use]
pub fn bucket_hourly(
    window_start: DateTime<Utc>,
    offset: FixedOffset,
    entered: &[Vehicle],
    exited: &[Vehicle],
    now: DateTime<Utc>,
) -> Vec<HourlyBucket> {
    let mut buckets: Vec<HourlyBucket> = (0..HOURLY_BUCKETS)
        .map(|i| {
            #[allow(clippy::cast_possible_wrap)]
            let start = window_start + TimeDelta::hours(i as i64);
            HourlyBucket {
                label: format!("{}h", start.with_timezone(&offset).hour()),
                start,
                entries: 0,
                entries_exited: 0,
                exits: 0,
            }
        })
        .collect();

    for v in entered {
        let slot = hour_slot(v.entry_time, window_start);
        if let Some(bucket) = slot.and_then(|i| buckets.get_mut(i)) {
            bucket.entries += 1;
            if v.exit_time.is_some_and(|exit| exit <= now) {
                bucket.entries_exited += 1;
            }
        }
    }
    for v in exited {
        let slot = v.exit_time.and_then(|exit| hour_slot(exit, window_start));
        if let Some(bucket) = slot.and_then(|i| buckets.get_mut(i)) {
            bucket.exits += 1;
        }
    }

    buckets
}

/// Count entries per local weekday, Sunday first.
#[must_use]
pub fn bucket_weekdays(records: &[Vehicle], offset: FixedOffset) -> Vec<WeekdayBucket> {
    let mut counts = [0u64; 7];
    for v in records {
        if let Some(count) = counts.get_mut(weekday_index(v.entry_time, offset)) {
            *count += 1;
        }
    }
    WEEKDAY_LABELS
        .iter()
        .zip(counts)
        .map(|(&label, value)| WeekdayBucket { label, value })
        .collect()
}

/// Average stay of closed records per local weekday of entry, Sunday first.
#[must_use]
pub fn average_stay_by_weekday(records: &[Vehicle], offset: FixedOffset) -> Vec<WeekdayStay> {
    let mut totals = [(0i64, 0u64); 7];
    for v in records {
        let Some(exit) = v.exit_time else { continue };
        if let Some(slot) = totals.get_mut(weekday_index(v.entry_time, offset)) {
            slot.0 += (exit - v.entry_time).num_minutes().max(0);
            slot.1 += 1;
        }
    }
    WEEKDAY_LABELS
        .iter()
        .zip(totals)
        .map(|(&label, (minutes, samples))| WeekdayStay {
            label,
            average_minutes: i64::try_from(samples)
                .ok()
                .filter(|&n| n > 0)
                .map_or(0, |n| minutes / n),
            samples,
        })
        .collect()
}

/// Percentage change from `yesterday` to `today`, rounded half up.
///
/// Returns 100 when `yesterday` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn percentage_delta(today: u64, yesterday: u64) -> i64 {
    if yesterday == 0 {
        return 100;
    }
    let change = (today as f64 - yesterday as f64) / yesterday as f64 * 100.0;
    (change + 0.5).floor() as i64
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;
    use garagem_core::{Plate, UserId, VehicleId};

    use super::*;
    use crate::clock::FixedClock;
    use crate::db::MemoryRecordStore;
    use crate::services::VehicleLedger;

    fn brt() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    fn record(entry: DateTime<Utc>, exit: Option<DateTime<Utc>>) -> Vehicle {
        Vehicle {
            id: VehicleId::generate(),
            plate: Plate::parse("ABC1D23").unwrap(),
            driver: "Ana".to_string(),
            entry_time: entry,
            exit_time: exit,
            parking_lot_id: ParkingLotId::generate(),
        }
    }

    #[test]
    fn test_percentage_delta() {
        assert_eq!(percentage_delta(0, 0), 100);
        assert_eq!(percentage_delta(7, 0), 100);
        assert_eq!(percentage_delta(10, 10), 0);
        assert_eq!(percentage_delta(15, 10), 50);
        assert_eq!(percentage_delta(5, 10), -50);
        // 1/3 -> 33.3, 2/3 -> 66.7, -1/8 -> -12.5 rounds toward +inf.
        assert_eq!(percentage_delta(4, 3), 33);
        assert_eq!(percentage_delta(5, 3), 67);
        assert_eq!(percentage_delta(7, 8), -12);
    }

    #[test]
    fn test_hourly_window_has_24_labelled_buckets() {
        // 12:20 local.
        let now = Utc.with_ymd_and_hms(2024, 7, 10, 15, 20, 0).unwrap();
        let start = hourly_window_start(now, brt());
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 7, 9, 16, 0, 0).unwrap());

        let buckets = bucket_hourly(start, brt(), &[], &[], now);
        assert_eq!(buckets.len(), HOURLY_BUCKETS);
        assert_eq!(buckets[0].label, "13h");
        assert_eq!(buckets[23].label, "12h");
    }

    #[test]
    fn test_hourly_counts_entries_and_exits() {
        let now = Utc.with_ymd_and_hms(2024, 7, 10, 15, 20, 0).unwrap();
        let start = hourly_window_start(now, brt());

        let recent = record(now - TimeDelta::minutes(10), None);
        let left = record(
            now - TimeDelta::hours(2),
            Some(now - TimeDelta::minutes(5)),
        );
        let stale = record(now - TimeDelta::hours(30), Some(now - TimeDelta::hours(1)));

        let entered = vec![recent.clone(), left.clone()];
        let exited = vec![left, stale];
        let buckets = bucket_hourly(start, brt(), &entered, &exited, now);

        assert_eq!(buckets[23].entries, 1);
        assert_eq!(buckets[21].label, "10h");
        assert_eq!(buckets[21].entries, 1);
        assert_eq!(buckets[21].entries_exited, 1);
        assert_eq!(buckets[23].exits, 1);
        assert_eq!(buckets[22].exits, 1);
        assert_eq!(buckets.iter().map(|b| b.entries).sum::<u64>(), 2);
    }

    #[test]
    fn test_weekday_buckets_use_local_day() {
        // Sunday 01:00 UTC is Saturday 22:00 in -03:00.
        let saturday_night = Utc.with_ymd_and_hms(2024, 7, 7, 1, 0, 0).unwrap();
        let sunday_noon = Utc.with_ymd_and_hms(2024, 7, 7, 15, 0, 0).unwrap();
        let records = vec![record(saturday_night, None), record(sunday_noon, None)];

        let buckets = bucket_weekdays(&records, brt());
        let labels: Vec<&str> = buckets.iter().map(|b| b.label).collect();
        assert_eq!(labels, WEEKDAY_LABELS);
        assert_eq!(buckets[0].value, 1);
        assert_eq!(buckets[6].value, 1);
    }

    #[test]
    fn test_wednesday_entry_only_counts_for_qua() {
        // Wednesday 23:30 local is already Thursday in UTC.
        let wednesday_late = Utc.with_ymd_and_hms(2024, 7, 11, 2, 30, 0).unwrap();
        let buckets = bucket_weekdays(&[record(wednesday_late, None)], brt());

        for bucket in &buckets {
            let expected = u64::from(bucket.label == "Qua");
            assert_eq!(bucket.value, expected, "bucket {}", bucket.label);
        }
    }

    #[test]
    fn test_average_stay_skips_open_records() {
        let monday = Utc.with_ymd_and_hms(2024, 7, 8, 12, 0, 0).unwrap();
        let records = vec![
            record(monday, Some(monday + TimeDelta::minutes(30))),
            record(monday, Some(monday + TimeDelta::minutes(91))),
            record(monday, None),
        ];
        let stays = average_stay_by_weekday(&records, brt());
        assert_eq!(stays[1].label, "Seg");
        assert_eq!(stays[1].samples, 2);
        assert_eq!(stays[1].average_minutes, 60);
        assert_eq!(stays[2].average_minutes, 0);
    }

    #[tokio::test]
    async fn test_dashboard_views() {
        let store = MemoryRecordStore::new();
        // Wednesday 12:20 local.
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 7, 10, 15, 20, 0).unwrap());
        let lot = ParkingLot {
            id: ParkingLotId::generate(),
            name: " ".to_string(),
            owner_id: UserId::generate(),
            shared_with: Vec::new(),
            created_at: clock.now(),
        };
        store.insert_lot(&lot).await.unwrap();
        let ledger = VehicleLedger::new(&store, &clock);

        // Yesterday (Tuesday) 10:00 local: two entries.
        clock.set(Utc.with_ymd_and_hms(2024, 7, 9, 13, 0, 0).unwrap());
        let a = ledger.register_entry("AAA1111", "Ana", lot.id).await.unwrap();
        ledger.register_entry("BBB2222", "Bia", lot.id).await.unwrap();
        clock.advance(TimeDelta::minutes(40));
        ledger.register_exit(a.id).await.unwrap();

        // Today: three entries, one still parked from yesterday.
        clock.set(Utc.with_ymd_and_hms(2024, 7, 10, 14, 0, 0).unwrap());
        for plate in ["CCC3333", "DDD4444", "EEE5555"] {
            ledger.register_entry(plate, "Caio", lot.id).await.unwrap();
        }
        clock.set(Utc.with_ymd_and_hms(2024, 7, 10, 15, 20, 0).unwrap());

        let analytics = AnalyticsAggregator::new(&store, &clock, brt());
        let dash = analytics
            .dashboard(std::slice::from_ref(&lot), Period::Week, Some(7))
            .await
            .unwrap();

        assert_eq!(dash.generation, Some(7));
        assert_eq!(dash.day_over_day.today, 3);
        assert_eq!(dash.day_over_day.yesterday, 2);
        assert_eq!(dash.day_over_day.delta_percent, 50);
        assert_eq!(dash.period_total, 5);
        assert_eq!(dash.weekday[2].value, 2);
        assert_eq!(dash.weekday[3].value, 3);
        assert_eq!(dash.average_stay[2].average_minutes, 40);

        assert_eq!(dash.occupancy.len(), 1);
        assert_eq!(dash.occupancy[0].name, "Desconhecido");
        assert_eq!(dash.occupancy[0].value, 4);

        // Yesterday's movement is older than the 24-hour window.
        assert_eq!(dash.hourly.len(), HOURLY_BUCKETS);
        assert_eq!(dash.hourly[22].label, "11h");
        assert_eq!(dash.hourly[22].entries, 3);
        assert_eq!(dash.hourly.iter().map(|b| b.entries).sum::<u64>(), 3);
        assert_eq!(dash.hourly.iter().map(|b| b.exits).sum::<u64>(), 0);
    }

    #[tokio::test]
    async fn test_occupancy_lists_every_lot() {
        let store = MemoryRecordStore::new();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 7, 10, 15, 0, 0).unwrap());
        let owner = UserId::generate();
        let mut lots = Vec::new();
        for name in ["Busy", "Empty"] {
            let lot = ParkingLot {
                id: ParkingLotId::generate(),
                name: name.to_string(),
                owner_id: owner,
                shared_with: Vec::new(),
                created_at: clock.now(),
            };
            store.insert_lot(&lot).await.unwrap();
            lots.push(lot);
        }
        VehicleLedger::new(&store, &clock)
            .register_entry("ABC1D23", "Ana", lots[0].id)
            .await
            .unwrap();

        let occupancy = AnalyticsAggregator::new(&store, &clock, brt())
            .occupancy(&lots)
            .await
            .unwrap();

        assert_eq!(occupancy.len(), 2);
        assert_eq!(occupancy[0].name, "Busy");
        assert_eq!(occupancy[0].value, 1);
        assert_eq!(occupancy[1].name, "Empty");
        assert_eq!(occupancy[1].value, 0);
    }

    #[tokio::test]
    async fn test_today_period_starts_at_local_midnight() {
        let store = MemoryRecordStore::new();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 7, 10, 15, 20, 0).unwrap());
        let analytics = AnalyticsAggregator::new(&store, &clock, brt());

        let dash = analytics.dashboard(&[], Period::Today, None).await.unwrap();
        assert_eq!(
            dash.period_start,
            Utc.with_ymd_and_hms(2024, 7, 10, 3, 0, 0).unwrap()
        );
        assert_eq!(dash.period_total, 0);
        assert!(dash.occupancy.is_empty());
        assert_eq!(dash.day_over_day.delta_percent, 100);
    }
}
