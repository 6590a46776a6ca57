//! In-memory record store.
//!
//! All tables sit behind one `tokio` `RwLock`, so every check-then-write
//! sequence (open-record uniqueness, share-list membership) runs under a
//! single write guard and is atomic with respect to other callers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use garagem_core::{Email, ParkingLotId, Plate, UserId, VehicleId};

use super::{RecordStore, RepositoryError, SetChange, VehicleQuery};
use crate::models::{NewUser, ParkingLot, PlateSuggestion, ProfileUpdate, User, Vehicle};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, (User, String)>,
    lots: HashMap<ParkingLotId, ParkingLot>,
    vehicles: HashMap<VehicleId, Vehicle>,
}

/// Thread-safe in-memory record store.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_lots<'a>(lots: impl Iterator<Item = &'a ParkingLot>) -> Vec<ParkingLot> {
    let mut lots: Vec<ParkingLot> = lots.cloned().collect();
    lots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    lots
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn insert_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let record = User {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            document: user.document.clone(),
            created_at: user.created_at,
            updated_at: user.created_at,
        };
        tables
            .users
            .insert(user.id, (record.clone(), user.password_hash.clone()));
        debug!(user_id = %user.id, total_users = tables.users.len(), "User inserted");
        Ok(record)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn user_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|(_, hash)| hash.clone()))
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|(user, _)| {
            user.full_name.clone_from(&update.full_name);
            user.phone.clone_from(&update.phone);
            user.document.clone_from(&update.document);
            user.updated_at = update.updated_at;
            user.clone()
        }))
    }

    async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some((user, hash)) => {
                password_hash.clone_into(hash);
                user.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_lot(&self, lot: &ParkingLot) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.lots.contains_key(&lot.id) {
            return Err(RepositoryError::Conflict("parking lot already exists".to_owned()));
        }
        tables.lots.insert(lot.id, lot.clone());
        Ok(())
    }

    async fn lot_by_id(&self, id: ParkingLotId) -> Result<Option<ParkingLot>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.lots.get(&id).cloned())
    }

    async fn lots_owned_by(&self, owner: UserId) -> Result<Vec<ParkingLot>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(sorted_lots(
            tables.lots.values().filter(|lot| lot.owner_id == owner),
        ))
    }

    async fn lots_shared_with(&self, email: &Email) -> Result<Vec<ParkingLot>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(sorted_lots(
            tables.lots.values().filter(|lot| lot.is_shared_with(email)),
        ))
    }

    async fn add_share(
        &self,
        lot: ParkingLotId,
        email: &Email,
    ) -> Result<SetChange, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(lot) = tables.lots.get_mut(&lot) else {
            return Ok(SetChange::LotMissing);
        };
        if lot.shared_with.contains(email) {
            return Ok(SetChange::Unchanged);
        }
        lot.shared_with.push(email.clone());
        Ok(SetChange::Applied)
    }

    async fn remove_share(
        &self,
        lot: ParkingLotId,
        email: &Email,
    ) -> Result<SetChange, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(lot) = tables.lots.get_mut(&lot) else {
            return Ok(SetChange::LotMissing);
        };
        let before = lot.shared_with.len();
        lot.shared_with.retain(|e| e != email);
        if lot.shared_with.len() == before {
            Ok(SetChange::Unchanged)
        } else {
            Ok(SetChange::Applied)
        }
    }

    async fn delete_lot(&self, id: ParkingLotId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.lots.remove(&id).is_none() {
            return Ok(false);
        }
        let before = tables.vehicles.len();
        tables.vehicles.retain(|_, v| v.parking_lot_id != id);
        debug!(
            parking_lot_id = %id,
            vehicles_removed = before - tables.vehicles.len(),
            "Parking lot deleted"
        );
        Ok(true)
    }

    async fn insert_open_vehicle(&self, vehicle: &Vehicle) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let already_open = tables.vehicles.values().any(|v| {
            v.parking_lot_id == vehicle.parking_lot_id && v.plate == vehicle.plate && v.is_open()
        });
        if already_open {
            return Err(RepositoryError::Conflict(format!(
                "plate {} already has an open record",
                vehicle.plate
            )));
        }
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(())
    }

    async fn vehicle_by_id(&self, id: VehicleId) -> Result<Option<Vehicle>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.vehicles.get(&id).cloned())
    }

    async fn close_vehicle(
        &self,
        id: VehicleId,
        exit_time: DateTime<Utc>,
    ) -> Result<Option<Vehicle>, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .vehicles
            .get_mut(&id)
            .filter(|v| v.is_open())
            .map(|v| {
                v.exit_time = Some(exit_time);
                v.clone()
            }))
    }

    async fn find_vehicles(&self, query: &VehicleQuery) -> Result<Vec<Vehicle>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut found: Vec<Vehicle> = tables
            .vehicles
            .values()
            .filter(|v| query.matches(v))
            .cloned()
            .collect();
        if query.newest_first {
            found.sort_by(|a, b| b.entry_time.cmp(&a.entry_time));
        }
        Ok(found)
    }

    async fn count_vehicles(&self, query: &VehicleQuery) -> Result<u64, RepositoryError> {
        let tables = self.tables.read().await;
        let count = tables.vehicles.values().filter(|v| query.matches(v)).count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn plate_suggestions(
        &self,
        lot: ParkingLotId,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<PlateSuggestion>, RepositoryError> {
        let tables = self.tables.read().await;

        // Plate -> (latest entry, driver); BTreeMap keeps plates sorted.
        let mut latest: BTreeMap<&Plate, (DateTime<Utc>, &str)> = BTreeMap::new();
        for v in tables
            .vehicles
            .values()
            .filter(|v| v.parking_lot_id == lot && v.plate.as_str().starts_with(prefix))
        {
            latest
                .entry(&v.plate)
                .and_modify(|seen| {
                    if v.entry_time > seen.0 {
                        *seen = (v.entry_time, v.driver.as_str());
                    }
                })
                .or_insert((v.entry_time, v.driver.as_str()));
        }

        Ok(latest
            .into_iter()
            .take(limit)
            .map(|(plate, (_, driver))| PlateSuggestion {
                plate: plate.clone(),
                driver: driver.to_owned(),
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    fn lot(owner: UserId) -> ParkingLot {
        ParkingLot {
            id: ParkingLotId::generate(),
            name: "Central".to_string(),
            owner_id: owner,
            shared_with: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn vehicle(lot: ParkingLotId, plate: &str, driver: &str, entry: DateTime<Utc>) -> Vehicle {
        Vehicle {
            id: VehicleId::generate(),
            plate: Plate::parse(plate).unwrap(),
            driver: driver.to_string(),
            entry_time: entry,
            exit_time: None,
            parking_lot_id: lot,
        }
    }

    #[tokio::test]
    async fn test_second_open_record_conflicts() {
        let store = MemoryRecordStore::new();
        let lot = lot(UserId::generate());
        store.insert_lot(&lot).await.unwrap();

        let t = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let first = vehicle(lot.id, "AAA1111", "Ana", t);
        store.insert_open_vehicle(&first).await.unwrap();

        let second = vehicle(lot.id, "AAA1111", "Ana", t);
        assert!(matches!(
            store.insert_open_vehicle(&second).await,
            Err(RepositoryError::Conflict(_))
        ));

        // Closing the first record frees the plate.
        store.close_vehicle(first.id, t).await.unwrap().unwrap();
        store.insert_open_vehicle(&second).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_vehicle_only_once() {
        let store = MemoryRecordStore::new();
        let lot = lot(UserId::generate());
        store.insert_lot(&lot).await.unwrap();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let v = vehicle(lot.id, "BBB2222", "Bia", t);
        store.insert_open_vehicle(&v).await.unwrap();

        let exit = t + TimeDelta::minutes(10);
        let closed = store.close_vehicle(v.id, exit).await.unwrap().unwrap();
        assert_eq!(closed.exit_time, Some(exit));

        let again = store
            .close_vehicle(v.id, exit + TimeDelta::minutes(5))
            .await
            .unwrap();
        assert!(again.is_none());
        let stored = store.vehicle_by_id(v.id).await.unwrap().unwrap();
        assert_eq!(stored.exit_time, Some(exit));
    }

    #[tokio::test]
    async fn test_share_set_operations() {
        let store = MemoryRecordStore::new();
        let lot = lot(UserId::generate());
        store.insert_lot(&lot).await.unwrap();
        let email = Email::parse("caio@garagem.app").unwrap();

        assert_eq!(store.add_share(lot.id, &email).await.unwrap(), SetChange::Applied);
        assert_eq!(store.add_share(lot.id, &email).await.unwrap(), SetChange::Unchanged);
        assert_eq!(store.lots_shared_with(&email).await.unwrap().len(), 1);

        assert_eq!(store.remove_share(lot.id, &email).await.unwrap(), SetChange::Applied);
        assert_eq!(store.remove_share(lot.id, &email).await.unwrap(), SetChange::Unchanged);
        assert_eq!(
            store
                .add_share(ParkingLotId::generate(), &email)
                .await
                .unwrap(),
            SetChange::LotMissing
        );
    }

    #[tokio::test]
    async fn test_delete_lot_cascades() {
        let store = MemoryRecordStore::new();
        let owner = UserId::generate();
        let doomed = lot(owner);
        let kept = lot(owner);
        store.insert_lot(&doomed).await.unwrap();
        store.insert_lot(&kept).await.unwrap();

        let t = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        store
            .insert_open_vehicle(&vehicle(doomed.id, "CCC3333", "Caio", t))
            .await
            .unwrap();
        store
            .insert_open_vehicle(&vehicle(kept.id, "CCC3333", "Caio", t))
            .await
            .unwrap();

        assert!(store.delete_lot(doomed.id).await.unwrap());
        assert!(!store.delete_lot(doomed.id).await.unwrap());
        let all = VehicleQuery::in_lots(vec![doomed.id, kept.id]);
        assert_eq!(store.count_vehicles(&all).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_plate_suggestions_use_latest_driver() {
        let store = MemoryRecordStore::new();
        let lot = lot(UserId::generate());
        store.insert_lot(&lot).await.unwrap();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();

        let old = vehicle(lot.id, "ABC1234", "Antigo", t);
        store.insert_open_vehicle(&old).await.unwrap();
        store.close_vehicle(old.id, t).await.unwrap();
        store
            .insert_open_vehicle(&vehicle(lot.id, "ABC1234", "Novo", t + TimeDelta::hours(1)))
            .await
            .unwrap();
        store
            .insert_open_vehicle(&vehicle(lot.id, "ABA0001", "Outro", t))
            .await
            .unwrap();
        store
            .insert_open_vehicle(&vehicle(lot.id, "XYZ0001", "Fora", t))
            .await
            .unwrap();

        let found = store.plate_suggestions(lot.id, "AB", 5).await.unwrap();
        let plates: Vec<&str> = found.iter().map(|s| s.plate.as_str()).collect();
        assert_eq!(plates, ["ABA0001", "ABC1234"]);
        assert_eq!(found[1].driver, "Novo");
    }
}
