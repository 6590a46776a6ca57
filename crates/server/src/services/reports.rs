//! Vehicle movement reports.
//!
//! A report covers the records of one lot whose entry falls between local
//! 00:00:00.000 of the start date and 23:59:59.999 of the end date, newest
//! first. The same [`Report`] feeds the JSON response and both exporters.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use garagem_core::{ParkingLotId, end_of_day, start_of_day};

use super::ServiceError;
use crate::clock::Clock;
use crate::db::{RecordStore, VehicleQuery};
use crate::models::VehicleReport;

/// A generated report and its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub lot_id: ParkingLotId,
    pub lot_name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub generated_at: DateTime<Utc>,
    /// Profile full name of the requester, else their email.
    pub generated_by: String,
    /// Local offset used for day boundaries and printed timestamps.
    #[serde(skip)]
    pub offset: FixedOffset,
    pub rows: Vec<VehicleReport>,
}

/// Builds [`Report`]s from the record store.
pub struct ReportAggregator<'a> {
    store: &'a dyn RecordStore,
    clock: &'a dyn Clock,
    offset: FixedOffset,
}

impl<'a> ReportAggregator<'a> {
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, clock: &'a dyn Clock, offset: FixedOffset) -> Self {
        Self {
            store,
            clock,
            offset,
        }
    }

    /// Collect the lot's records for `[start, end]` (local calendar dates).
    ///
    /// Open records report their stay up to the generation time.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailure` if `start` is after `end` and `NotFound`
    /// for an unknown lot.
    #[instrument(skip(self), fields(parking_lot_id = %lot_id))]
    pub async fn build(
        &self,
        lot_id: ParkingLotId,
        start: NaiveDate,
        end: NaiveDate,
        generated_by: &str,
    ) -> Result<Report, ServiceError> {
        if start > end {
            return Err(ServiceError::validation(
                "A data inicial deve ser anterior ou igual à data final",
            ));
        }

        let lot = self
            .store
            .lot_by_id(lot_id)
            .await?
            .ok_or(ServiceError::NotFound("Estacionamento"))?;

        let query = VehicleQuery::in_lot(lot_id)
            .entered_from(start_of_day(start, self.offset))
            .entered_until(end_of_day(end, self.offset))
            .newest_first();
        let vehicles = self.store.find_vehicles(&query).await?;

        let now = self.clock.now();
        let lot_name = lot.display_name().to_owned();
        let rows: Vec<VehicleReport> = vehicles
            .into_iter()
            .map(|v| VehicleReport::new(v, &lot_name, now))
            .collect();

        debug!(rows = rows.len(), "Report built");

        Ok(Report {
            lot_id,
            lot_name,
            start,
            end,
            generated_at: now,
            generated_by: generated_by.to_owned(),
            offset: self.offset,
            rows,
        })
    }
}
