//! Parking lot route handlers.
//!
//! Creation, sharing, leaving and deletion. Ownership rules live in
//! [`ParkingLotRegistry`]; handlers only translate HTTP.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use garagem_core::ParkingLotId;

use crate::error::{AppError, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, ParkingLot};
use crate::services::ParkingLotRegistry;
use crate::state::AppState;

/// Lot creation request body.
#[derive(Debug, Deserialize)]
pub struct NewLotRequest {
    pub name: String,
}

/// Share request body.
#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub email: String,
}

/// A lot as listed for one user.
#[derive(Debug, Serialize)]
pub struct LotView {
    #[serde(flatten)]
    pub lot: ParkingLot,
    /// Whether the requesting user owns the lot.
    pub is_owner: bool,
}

impl LotView {
    fn for_user(lot: ParkingLot, user: &CurrentUser) -> Self {
        Self {
            is_owner: lot.is_owner(user.id),
            lot,
        }
    }
}

/// Lots the user owns followed by lots shared with them.
///
/// # Errors
///
/// Returns `503` if the store is unavailable.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<LotView>>, AppError> {
    let registry = ParkingLotRegistry::new(state.store(), state.clock());
    let lots = registry.list_accessible(&user).await?;
    Ok(Json(
        lots.into_iter()
            .map(|lot| LotView::for_user(lot, &user))
            .collect(),
    ))
}

/// Create a lot owned by the user.
///
/// # Errors
///
/// Returns `400` for a blank name.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<NewLotRequest>,
) -> Result<(StatusCode, Json<LotView>), AppError> {
    let registry = ParkingLotRegistry::new(state.store(), state.clock());
    let lot = registry.create(&form.name, user.id).await?;
    add_breadcrumb("lots", "Parking lot created", Some(&[("name", lot.name.as_str())]));
    Ok((StatusCode::CREATED, Json(LotView::for_user(lot, &user))))
}

/// Delete a lot and its vehicle records.
///
/// # Errors
///
/// Returns `403` unless the user owns the lot.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ParkingLotId>,
) -> Result<StatusCode, AppError> {
    ParkingLotRegistry::new(state.store(), state.clock())
        .delete(id, &user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Share a lot with another account.
///
/// # Errors
///
/// Returns `409` for the owner's own email or an existing share, `404` for
/// an email without an account.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn share(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ParkingLotId>,
    Json(form): Json<ShareRequest>,
) -> Result<Json<LotView>, AppError> {
    let registry = ParkingLotRegistry::new(state.store(), state.clock());
    let lot = registry.share_with(id, &user, &form.email).await?;
    Ok(Json(LotView::for_user(lot, &user)))
}

/// Remove an email from the lot's share list.
///
/// # Errors
///
/// Returns `403` unless the user owns the lot.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn unshare(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((id, email)): Path<(ParkingLotId, String)>,
) -> Result<Json<LotView>, AppError> {
    let registry = ParkingLotRegistry::new(state.store(), state.clock());
    let lot = registry.revoke_shared_access(id, &user, &email).await?;
    Ok(Json(LotView::for_user(lot, &user)))
}

/// A shared user leaves the lot.
///
/// # Errors
///
/// Returns `400` if the owner tries to leave their own lot.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn leave(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ParkingLotId>,
) -> Result<StatusCode, AppError> {
    ParkingLotRegistry::new(state.store(), state.clock())
        .revoke_self_access(id, &user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
