//! Vehicle entry/exit route handlers.
//!
//! Every handler resolves the lot through
//! [`ParkingLotRegistry::ensure_access`] before touching the ledger.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use garagem_core::{ParkingLotId, VehicleId};

use crate::error::{AppError, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{PlateSuggestion, Vehicle, VehicleReport};
use crate::services::{ParkingLotRegistry, VehicleLedger};
use crate::state::AppState;

/// Entry request body.
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub plate: String,
    pub driver: String,
}

/// Autocomplete query.
#[derive(Debug, Deserialize)]
pub struct PlateQuery {
    #[serde(default)]
    pub prefix: String,
}

/// Vehicles currently parked in the lot, newest first.
///
/// # Errors
///
/// Returns `403` without access to the lot.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn parked(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(lot_id): Path<ParkingLotId>,
) -> Result<Json<Vec<VehicleReport>>, AppError> {
    let lot = ParkingLotRegistry::new(state.store(), state.clock())
        .ensure_access(lot_id, &user)
        .await?;
    let ledger = VehicleLedger::new(state.store(), state.clock());
    Ok(Json(ledger.list_parked(lot.id).await?))
}

/// Register a vehicle entering the lot.
///
/// # Errors
///
/// Returns `400` for a blank plate or driver and `409` if the plate is
/// already parked in the lot.
#[instrument(skip(state, user, form), fields(user_id = %user.id, plate = %form.plate))]
pub async fn entry(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(lot_id): Path<ParkingLotId>,
    Json(form): Json<EntryRequest>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    let lot = ParkingLotRegistry::new(state.store(), state.clock())
        .ensure_access(lot_id, &user)
        .await?;
    let ledger = VehicleLedger::new(state.store(), state.clock());
    let vehicle = ledger.register_entry(&form.plate, &form.driver, lot.id).await?;

    add_breadcrumb("ledger", "Vehicle entry", Some(&[("plate", vehicle.plate.as_str())]));
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// Register a vehicle leaving.
///
/// # Errors
///
/// Returns `404` for an unknown record, `403` without access to its lot
/// and `400` if the exit was already registered.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn exit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<VehicleId>,
) -> Result<Json<Vehicle>, AppError> {
    let ledger = VehicleLedger::new(state.store(), state.clock());
    let vehicle = ledger.vehicle(id).await?;
    ParkingLotRegistry::new(state.store(), state.clock())
        .ensure_access(vehicle.parking_lot_id, &user)
        .await?;

    let vehicle = ledger.register_exit(id).await?;
    add_breadcrumb("ledger", "Vehicle exit", Some(&[("plate", vehicle.plate.as_str())]));
    Ok(Json(vehicle))
}

/// Plates of the lot starting with `prefix`.
///
/// # Errors
///
/// Returns `403` without access to the lot.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn plates(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(lot_id): Path<ParkingLotId>,
    Query(query): Query<PlateQuery>,
) -> Result<Json<Vec<PlateSuggestion>>, AppError> {
    let lot = ParkingLotRegistry::new(state.store(), state.clock())
        .ensure_access(lot_id, &user)
        .await?;
    let ledger = VehicleLedger::new(state.store(), state.clock());
    Ok(Json(ledger.suggest_plates(lot.id, &query.prefix).await?))
}
