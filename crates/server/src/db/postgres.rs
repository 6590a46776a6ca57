//! `PostgreSQL` record store.
//!
//! Queries are checked at runtime (`sqlx::query_as` / `QueryBuilder`), so the
//! crate builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use garagem_core::{Email, ParkingLotId, Plate, UserId, VehicleId};

use super::query::{RangeEnd, TimeRange, VehicleQuery};
use super::{RecordStore, RepositoryError, SetChange};
use crate::models::{NewUser, ParkingLot, PlateSuggestion, ProfileUpdate, User, Vehicle};

const USER_COLUMNS: &str = "id, full_name, email, phone, document, created_at, updated_at";
const LOT_COLUMNS: &str = "id, name, owner_id, shared_with, created_at";
const VEHICLE_COLUMNS: &str = "id, parking_lot_id, plate, driver, entry_time, exit_time";

/// Record store backed by the `garagem` schema.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (shared with the session store).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    full_name: String,
    email: String,
    phone: Option<String>,
    document: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: UserId::from_uuid(row.id),
            full_name: row.full_name,
            email,
            phone: row.phone,
            document: row.document,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LotRow {
    id: Uuid,
    name: String,
    owner_id: Uuid,
    shared_with: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LotRow> for ParkingLot {
    type Error = RepositoryError;

    fn try_from(row: LotRow) -> Result<Self, Self::Error> {
        let shared_with = row
            .shared_with
            .iter()
            .map(|e| Email::parse(e))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid shared email in database: {e}"))
            })?;
        Ok(Self {
            id: ParkingLotId::from_uuid(row.id),
            name: row.name,
            owner_id: UserId::from_uuid(row.owner_id),
            shared_with,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    parking_lot_id: Uuid,
    plate: String,
    driver: String,
    entry_time: DateTime<Utc>,
    exit_time: Option<DateTime<Utc>>,
}

impl TryFrom<VehicleRow> for Vehicle {
    type Error = RepositoryError;

    fn try_from(row: VehicleRow) -> Result<Self, Self::Error> {
        let plate = Plate::parse(&row.plate).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid plate in database: {e}"))
        })?;
        Ok(Self {
            id: VehicleId::from_uuid(row.id),
            plate,
            driver: row.driver,
            entry_time: row.entry_time,
            exit_time: row.exit_time,
            parking_lot_id: ParkingLotId::from_uuid(row.parking_lot_id),
        })
    }
}

#[derive(sqlx::FromRow)]
struct SuggestionRow {
    plate: String,
    driver: String,
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, RepositoryError>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Map a unique violation to [`RepositoryError::Conflict`].
fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message.to_owned());
        }
        RepositoryError::Database(e)
    }
}

/// Escape `LIKE` metacharacters so user input only matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Query building
// =============================================================================

fn push_range(qb: &mut QueryBuilder<'_, Postgres>, column: &str, range: &TimeRange) {
    if let Some(from) = range.from {
        qb.push(format!(" AND {column} >= ")).push_bind(from);
    }
    match range.to {
        Some(RangeEnd::Inclusive(to)) => {
            qb.push(format!(" AND {column} <= ")).push_bind(to);
        }
        Some(RangeEnd::Exclusive(to)) => {
            qb.push(format!(" AND {column} < ")).push_bind(to);
        }
        None => {}
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &VehicleQuery) {
    let lots: Vec<Uuid> = query.lots.iter().map(ParkingLotId::as_uuid).collect();
    qb.push(" WHERE parking_lot_id = ANY(")
        .push_bind(lots)
        .push(")");
    push_range(qb, "entry_time", &query.entry);
    push_range(qb, "exit_time", &query.exit);
    if query.only_open {
        qb.push(" AND exit_time IS NULL");
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    async fn insert_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO garagem.app_user
                (id, full_name, email, phone, document, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.document)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique("email already exists"))?;

        row.try_into()
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM garagem.app_user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM garagem.app_user WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn user_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let Some(user) = self.user_by_email(email).await? else {
            return Ok(None);
        };
        let hash = self.password_hash(user.id).await?;
        Ok(hash.map(|h| (user, h)))
    }

    async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM garagem.app_user WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(hash)
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            UPDATE garagem.app_user
            SET full_name = $2, phone = $3, document = $4, updated_at = $5
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.full_name)
        .bind(&update.phone)
        .bind(&update.document)
        .bind(update.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE garagem.app_user SET password_hash = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Parking lots
    // -------------------------------------------------------------------------

    async fn insert_lot(&self, lot: &ParkingLot) -> Result<(), RepositoryError> {
        let shared: Vec<&str> = lot.shared_with.iter().map(Email::as_str).collect();
        sqlx::query(
            r"
            INSERT INTO garagem.parking_lot (id, name, owner_id, shared_with, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(lot.id)
        .bind(&lot.name)
        .bind(lot.owner_id)
        .bind(shared)
        .bind(lot.created_at)
        .execute(&self.pool)
        .await
        .map_err(conflict_on_unique("parking lot already exists"))?;

        Ok(())
    }

    async fn lot_by_id(&self, id: ParkingLotId) -> Result<Option<ParkingLot>, RepositoryError> {
        let row: Option<LotRow> = sqlx::query_as(&format!(
            "SELECT {LOT_COLUMNS} FROM garagem.parking_lot WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ParkingLot::try_from).transpose()
    }

    async fn lots_owned_by(&self, owner: UserId) -> Result<Vec<ParkingLot>, RepositoryError> {
        let rows: Vec<LotRow> = sqlx::query_as(&format!(
            "SELECT {LOT_COLUMNS} FROM garagem.parking_lot WHERE owner_id = $1 ORDER BY created_at, id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn lots_shared_with(&self, email: &Email) -> Result<Vec<ParkingLot>, RepositoryError> {
        // `@>` uses the GIN index on shared_with.
        let rows: Vec<LotRow> = sqlx::query_as(&format!(
            "SELECT {LOT_COLUMNS} FROM garagem.parking_lot WHERE shared_with @> ARRAY[$1]::text[] ORDER BY created_at, id"
        ))
        .bind(email.as_str())
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn add_share(
        &self,
        lot: ParkingLotId,
        email: &Email,
    ) -> Result<SetChange, RepositoryError> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            r"
            UPDATE garagem.parking_lot
            SET shared_with = array_append(shared_with, $2)
            WHERE id = $1 AND NOT ($2 = ANY(shared_with))
            RETURNING id
            ",
        )
        .bind(lot)
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_some() {
            return Ok(SetChange::Applied);
        }
        self.unchanged_or_missing(lot).await
    }

    async fn remove_share(
        &self,
        lot: ParkingLotId,
        email: &Email,
    ) -> Result<SetChange, RepositoryError> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            r"
            UPDATE garagem.parking_lot
            SET shared_with = array_remove(shared_with, $2)
            WHERE id = $1 AND $2 = ANY(shared_with)
            RETURNING id
            ",
        )
        .bind(lot)
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_some() {
            return Ok(SetChange::Applied);
        }
        self.unchanged_or_missing(lot).await
    }

    async fn delete_lot(&self, id: ParkingLotId) -> Result<bool, RepositoryError> {
        // Vehicles go with the lot via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM garagem.parking_lot WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Vehicles
    // -------------------------------------------------------------------------

    async fn insert_open_vehicle(&self, vehicle: &Vehicle) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO garagem.vehicle (id, parking_lot_id, plate, driver, entry_time, exit_time)
            VALUES ($1, $2, $3, $4, $5, NULL)
            ",
        )
        .bind(vehicle.id)
        .bind(vehicle.parking_lot_id)
        .bind(&vehicle.plate)
        .bind(&vehicle.driver)
        .bind(vehicle.entry_time)
        .execute(&self.pool)
        .await
        .map_err(conflict_on_unique("plate already has an open record"))?;

        Ok(())
    }

    async fn vehicle_by_id(&self, id: VehicleId) -> Result<Option<Vehicle>, RepositoryError> {
        let row: Option<VehicleRow> = sqlx::query_as(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM garagem.vehicle WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Vehicle::try_from).transpose()
    }

    async fn close_vehicle(
        &self,
        id: VehicleId,
        exit_time: DateTime<Utc>,
    ) -> Result<Option<Vehicle>, RepositoryError> {
        let row: Option<VehicleRow> = sqlx::query_as(&format!(
            r"
            UPDATE garagem.vehicle SET exit_time = $2
            WHERE id = $1 AND exit_time IS NULL
            RETURNING {VEHICLE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(exit_time)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Vehicle::try_from).transpose()
    }

    async fn find_vehicles(&self, query: &VehicleQuery) -> Result<Vec<Vehicle>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {VEHICLE_COLUMNS} FROM garagem.vehicle"
        ));
        push_filters(&mut qb, query);
        if query.newest_first {
            qb.push(" ORDER BY entry_time DESC, id");
        }

        let rows = qb
            .build_query_as::<VehicleRow>()
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn count_vehicles(&self, query: &VehicleQuery) -> Result<u64, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM garagem.vehicle");
        push_filters(&mut qb, query);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn plate_suggestions(
        &self,
        lot: ParkingLotId,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<PlateSuggestion>, RepositoryError> {
        // The inner DISTINCT ON picks each plate's latest entry; the prefix
        // LIKE is served by the text_pattern_ops index.
        let rows: Vec<SuggestionRow> = sqlx::query_as(
            r#"
            SELECT plate, driver FROM (
                SELECT DISTINCT ON (plate) plate, driver
                FROM garagem.vehicle
                WHERE parking_lot_id = $1 AND plate LIKE $2 ESCAPE '\'
                ORDER BY plate, entry_time DESC
            ) latest
            ORDER BY plate COLLATE "C"
            LIMIT $3
            "#,
        )
        .bind(lot)
        .bind(format!("{}%", escape_like(prefix)))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let plate = Plate::parse(&row.plate).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid plate in database: {e}"))
                })?;
                Ok(PlateSuggestion {
                    plate,
                    driver: row.driver,
                })
            })
            .collect()
    }
}

impl PgRecordStore {
    /// After a conditional update touched no row, tell apart "no change
    /// needed" from "no such lot".
    async fn unchanged_or_missing(&self, lot: ParkingLotId) -> Result<SetChange, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM garagem.parking_lot WHERE id = $1)")
                .bind(lot)
                .fetch_one(&self.pool)
                .await?;
        Ok(if exists {
            SetChange::Unchanged
        } else {
            SetChange::LotMissing
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("AB%_\\"), "AB\\%\\_\\\\");
        assert_eq!(escape_like("ABC"), "ABC");
    }

    #[test]
    fn test_filters_render_sql() {
        let t = Utc::now();
        let query = VehicleQuery::in_lot(ParkingLotId::generate())
            .entered_from(t)
            .entered_before(t)
            .open_only();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM garagem.vehicle");
        push_filters(&mut qb, &query);

        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM garagem.vehicle WHERE parking_lot_id = ANY($1) \
             AND entry_time >= $2 AND entry_time < $3 AND exit_time IS NULL"
        );
    }
}
