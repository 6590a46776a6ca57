//! Vehicle ledger: entries, exits, plate suggestions and the parked list.
//!
//! The ledger does not check lot access; callers resolve the lot through
//! [`ParkingLotRegistry::ensure_access`](super::ParkingLotRegistry::ensure_access)
//! first.

use tracing::{info, instrument};

use garagem_core::{ParkingLotId, Plate, PlateError, VehicleId};

use super::ServiceError;
use crate::clock::Clock;
use crate::db::{RecordStore, RepositoryError, VehicleQuery};
use crate::models::{PlateSuggestion, Vehicle, VehicleReport};

/// Maximum number of plate suggestions returned.
pub const SUGGESTION_LIMIT: usize = 5;

/// Shortest prefix that triggers suggestions.
pub const MIN_SUGGESTION_PREFIX: usize = 2;

/// Records vehicle entries and exits.
pub struct VehicleLedger<'a> {
    store: &'a dyn RecordStore,
    clock: &'a dyn Clock,
}

impl<'a> VehicleLedger<'a> {
    /// Create a ledger over the given store and clock.
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Register a vehicle entering a lot.
    ///
    /// The plate is trimmed and uppercased; the driver is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::ValidationFailure` if the plate or driver is
    /// empty or the plate is malformed, `ServiceError::NotFound` if the lot
    /// does not exist, and `ServiceError::DuplicateEntry` if the plate is
    /// already parked in the lot.
    #[instrument(skip(self), fields(parking_lot_id = %lot))]
    pub async fn register_entry(
        &self,
        plate: &str,
        driver: &str,
        lot: ParkingLotId,
    ) -> Result<Vehicle, ServiceError> {
        let plate = Plate::parse(plate).map_err(|e| match e {
            PlateError::Empty => ServiceError::validation("Informe a placa do veículo"),
            other => ServiceError::validation(format!("Placa inválida: {other}")),
        })?;
        let driver = driver.trim();
        if driver.is_empty() {
            return Err(ServiceError::validation("Informe o nome do condutor"));
        }

        if self.store.lot_by_id(lot).await?.is_none() {
            return Err(ServiceError::NotFound("Estacionamento"));
        }

        let vehicle = Vehicle {
            id: VehicleId::generate(),
            plate,
            driver: driver.to_owned(),
            entry_time: self.clock.now(),
            exit_time: None,
            parking_lot_id: lot,
        };

        match self.store.insert_open_vehicle(&vehicle).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => {
                return Err(ServiceError::DuplicateEntry(vehicle.plate));
            }
            Err(e) => return Err(e.into()),
        }

        info!(vehicle_id = %vehicle.id, plate = %vehicle.plate, "Vehicle entry registered");
        Ok(vehicle)
    }

    /// Close an open record with `exit_time = now`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown record and
    /// `ServiceError::ValidationFailure` if the exit was already registered.
    #[instrument(skip(self), fields(vehicle_id = %id))]
    pub async fn register_exit(&self, id: VehicleId) -> Result<Vehicle, ServiceError> {
        if let Some(vehicle) = self.store.close_vehicle(id, self.clock.now()).await? {
            info!(plate = %vehicle.plate, "Vehicle exit registered");
            return Ok(vehicle);
        }

        match self.store.vehicle_by_id(id).await? {
            None => Err(ServiceError::NotFound("Veículo")),
            Some(_) => Err(ServiceError::validation(
                "A saída deste veículo já foi registrada",
            )),
        }
    }

    /// Look up a single record.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the record does not exist.
    pub async fn vehicle(&self, id: VehicleId) -> Result<Vehicle, ServiceError> {
        self.store
            .vehicle_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Veículo"))
    }

    /// Autocomplete plates seen in the lot.
    ///
    /// Returns at most [`SUGGESTION_LIMIT`] distinct plates starting with
    /// `prefix` (case-insensitive), sorted, each with the driver of its most
    /// recent entry. Prefixes shorter than [`MIN_SUGGESTION_PREFIX`] yield an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BackendUnavailable` if the store fails.
    #[instrument(skip(self), fields(parking_lot_id = %lot))]
    pub async fn suggest_plates(
        &self,
        lot: ParkingLotId,
        prefix: &str,
    ) -> Result<Vec<PlateSuggestion>, ServiceError> {
        let prefix = prefix.trim().to_uppercase();
        if prefix.chars().count() < MIN_SUGGESTION_PREFIX {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .plate_suggestions(lot, &prefix, SUGGESTION_LIMIT)
            .await?)
    }

    /// Vehicles currently parked in the lot, newest first, with the elapsed
    /// stay so far.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the lot does not exist.
    #[instrument(skip(self), fields(parking_lot_id = %lot))]
    pub async fn list_parked(&self, lot: ParkingLotId) -> Result<Vec<VehicleReport>, ServiceError> {
        let parking_lot = self
            .store
            .lot_by_id(lot)
            .await?
            .ok_or(ServiceError::NotFound("Estacionamento"))?;

        let now = self.clock.now();
        let parked = self
            .store
            .find_vehicles(&VehicleQuery::in_lot(lot).open_only().newest_first())
            .await?;

        Ok(parked
            .into_iter()
            .map(|v| VehicleReport::new(v, parking_lot.display_name(), now))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use garagem_core::UserId;

    use super::*;
    use crate::clock::FixedClock;
    use crate::db::MemoryRecordStore;
    use crate::models::ParkingLot;

    async fn setup() -> (MemoryRecordStore, FixedClock, ParkingLotId) {
        let store = MemoryRecordStore::new();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 13, 0, 0).unwrap());
        let lot = ParkingLot {
            id: ParkingLotId::generate(),
            name: "Centro".to_string(),
            owner_id: UserId::generate(),
            shared_with: Vec::new(),
            created_at: clock.now(),
        };
        store.insert_lot(&lot).await.unwrap();
        (store, clock, lot.id)
    }

    #[tokio::test]
    async fn test_entry_normalizes_input() {
        let (store, clock, lot) = setup().await;
        let ledger = VehicleLedger::new(&store, &clock);

        let v = ledger.register_entry("  abc1d23 ", " Ana ", lot).await.unwrap();
        assert_eq!(v.plate.as_str(), "ABC1D23");
        assert_eq!(v.driver, "Ana");
        assert_eq!(v.entry_time, clock.now());
        assert!(v.is_open());
    }

    #[tokio::test]
    async fn test_entry_rejects_blank_fields() {
        let (store, clock, lot) = setup().await;
        let ledger = VehicleLedger::new(&store, &clock);

        assert!(matches!(
            ledger.register_entry("   ", "Ana", lot).await,
            Err(ServiceError::ValidationFailure(_))
        ));
        assert!(matches!(
            ledger.register_entry("ABC1D23", "  ", lot).await,
            Err(ServiceError::ValidationFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_open_entry_rejected_until_exit() {
        let (store, clock, lot) = setup().await;
        let ledger = VehicleLedger::new(&store, &clock);

        let first = ledger.register_entry("ABC1D23", "Ana", lot).await.unwrap();
        let dup = ledger.register_entry("abc1d23", "Bia", lot).await;
        assert!(matches!(dup, Err(ServiceError::DuplicateEntry(p)) if p.as_str() == "ABC1D23"));

        clock.advance(TimeDelta::minutes(30));
        ledger.register_exit(first.id).await.unwrap();
        assert!(ledger.register_entry("ABC1D23", "Bia", lot).await.is_ok());
    }

    #[tokio::test]
    async fn test_exit_is_recorded_once() {
        let (store, clock, lot) = setup().await;
        let ledger = VehicleLedger::new(&store, &clock);

        let v = ledger.register_entry("XYZ9876", "Caio", lot).await.unwrap();
        clock.advance(TimeDelta::minutes(42));
        let closed = ledger.register_exit(v.id).await.unwrap();
        assert_eq!(closed.exit_time, Some(clock.now()));

        clock.advance(TimeDelta::minutes(10));
        assert!(matches!(
            ledger.register_exit(v.id).await,
            Err(ServiceError::ValidationFailure(_))
        ));
        let stored = ledger.vehicle(v.id).await.unwrap();
        assert_eq!(stored.exit_time, closed.exit_time);

        assert!(matches!(
            ledger.register_exit(VehicleId::generate()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_suggestions_require_two_characters() {
        let (store, clock, lot) = setup().await;
        let ledger = VehicleLedger::new(&store, &clock);
        ledger.register_entry("ABC1D23", "Ana", lot).await.unwrap();

        assert!(ledger.suggest_plates(lot, "a").await.unwrap().is_empty());
        let found = ledger.suggest_plates(lot, "ab").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].driver, "Ana");
    }

    #[tokio::test]
    async fn test_suggestions_capped_and_sorted() {
        let (store, clock, lot) = setup().await;
        let ledger = VehicleLedger::new(&store, &clock);
        for plate in ["ABC0007", "ABC0003", "ABC0001", "ABC0005", "ABC0002", "ABC0006"] {
            ledger.register_entry(plate, "Ana", lot).await.unwrap();
        }

        let found = ledger.suggest_plates(lot, "abc").await.unwrap();
        let plates: Vec<&str> = found.iter().map(|s| s.plate.as_str()).collect();
        assert_eq!(
            plates,
            ["ABC0001", "ABC0002", "ABC0003", "ABC0005", "ABC0006"]
        );
    }

    #[tokio::test]
    async fn test_list_parked_reports_elapsed_stay() {
        let (store, clock, lot) = setup().await;
        let ledger = VehicleLedger::new(&store, &clock);
        let parked = ledger.register_entry("ABC1D23", "Ana", lot).await.unwrap();
        let gone = ledger.register_entry("DEF4567", "Bia", lot).await.unwrap();
        clock.advance(TimeDelta::minutes(75));
        ledger.register_exit(gone.id).await.unwrap();

        let rows = ledger.list_parked(lot).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vehicle.id, parked.id);
        assert_eq!(rows[0].parking_lot_name, "Centro");
        assert_eq!(rows[0].duration.to_string(), "1h 15min");
    }
}
