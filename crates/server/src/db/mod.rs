//! Record store for users, parking lots and vehicle records.
//!
//! Services talk to the [`RecordStore`] port; two adapters implement it:
//!
//! - [`PgRecordStore`] - `PostgreSQL`, used by the server binary and the CLI
//! - [`MemoryRecordStore`] - in-process tables, used by tests
//!
//! # Database schema: `garagem`
//!
//! - `app_user` - accounts and profiles (argon2 password hash)
//! - `parking_lot` - lots with their `shared_with` email array
//! - `vehicle` - entry/exit records, cascading on lot deletion
//!
//! The invariants that the service must never lose to a race are enforced by
//! the store itself: one open record per `(lot, plate)` (partial unique index)
//! and duplicate-free share lists (conditional `array_append`).
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p garagem-cli -- migrate
//! ```

mod memory;
mod postgres;
pub mod query;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use garagem_core::{Email, ParkingLotId, UserId, VehicleId};

use crate::models::{NewUser, ParkingLot, PlateSuggestion, ProfileUpdate, User, Vehicle};

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;
pub use query::{RangeEnd, TimeRange, VehicleQuery};

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// Conflict with existing data (e.g. unique constraint).
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Outcome of an atomic add/remove on a lot's share list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetChange {
    /// The email was added or removed.
    Applied,
    /// The set already had (add) or lacked (remove) the email.
    Unchanged,
    /// No lot with that ID exists.
    LotMissing,
}

/// Persistence port for every record the service owns.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Insert a user. Fails with [`RepositoryError::Conflict`] when the email
    /// is already registered.
    async fn insert_user(&self, user: &NewUser) -> Result<User, RepositoryError>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// A user together with their password hash, for login.
    async fn user_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// The password hash of a user, for re-authentication.
    async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError>;

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, RepositoryError>;

    /// Replace a password hash. Returns `false` if the user does not exist.
    async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    // -------------------------------------------------------------------------
    // Parking lots
    // -------------------------------------------------------------------------

    async fn insert_lot(&self, lot: &ParkingLot) -> Result<(), RepositoryError>;

    async fn lot_by_id(&self, id: ParkingLotId) -> Result<Option<ParkingLot>, RepositoryError>;

    /// Lots owned by `owner`, oldest first.
    async fn lots_owned_by(&self, owner: UserId) -> Result<Vec<ParkingLot>, RepositoryError>;

    /// Lots whose share list contains `email`, oldest first.
    async fn lots_shared_with(&self, email: &Email) -> Result<Vec<ParkingLot>, RepositoryError>;

    /// Atomically add `email` to the lot's share list unless present.
    async fn add_share(
        &self,
        lot: ParkingLotId,
        email: &Email,
    ) -> Result<SetChange, RepositoryError>;

    /// Atomically remove `email` from the lot's share list.
    async fn remove_share(
        &self,
        lot: ParkingLotId,
        email: &Email,
    ) -> Result<SetChange, RepositoryError>;

    /// Delete a lot and all of its vehicle records. Returns `false` if the
    /// lot did not exist.
    async fn delete_lot(&self, id: ParkingLotId) -> Result<bool, RepositoryError>;

    // -------------------------------------------------------------------------
    // Vehicles
    // -------------------------------------------------------------------------

    /// Insert an open record. Fails with [`RepositoryError::Conflict`] if the
    /// lot already has an open record for the same plate.
    async fn insert_open_vehicle(&self, vehicle: &Vehicle) -> Result<(), RepositoryError>;

    async fn vehicle_by_id(&self, id: VehicleId) -> Result<Option<Vehicle>, RepositoryError>;

    /// Set the exit time of an open record. Returns `None` if the record does
    /// not exist or is already closed.
    async fn close_vehicle(
        &self,
        id: VehicleId,
        exit_time: DateTime<Utc>,
    ) -> Result<Option<Vehicle>, RepositoryError>;

    async fn find_vehicles(&self, query: &VehicleQuery) -> Result<Vec<Vehicle>, RepositoryError>;

    async fn count_vehicles(&self, query: &VehicleQuery) -> Result<u64, RepositoryError>;

    /// Up to `limit` distinct plates of the lot starting with `prefix`
    /// (already uppercase), sorted, each with the driver of its latest entry.
    async fn plate_suggestions(
        &self,
        lot: ParkingLotId,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<PlateSuggestion>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
