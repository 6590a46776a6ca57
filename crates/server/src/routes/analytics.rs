//! Analytics dashboard route handler.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use garagem_core::{ParkingLotId, Period};

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::services::{AnalyticsAggregator, Dashboard, ParkingLotRegistry};
use crate::state::AppState;

/// Dashboard query: `?period=today|week|month|year&lot=<id>&generation=<n>`.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub period: Period,
    /// Restrict every view to one lot.
    pub lot: Option<ParkingLotId>,
    /// Opaque client token echoed in the response.
    pub generation: Option<u64>,
}

/// Every dashboard view over the selected lot, or all accessible lots.
///
/// # Errors
///
/// Returns `403` if the selected lot is not accessible.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Dashboard>, AppError> {
    let registry = ParkingLotRegistry::new(state.store(), state.clock());
    let lots = match query.lot {
        Some(lot_id) => vec![registry.ensure_access(lot_id, &user).await?],
        None => registry.list_accessible(&user).await?,
    };

    let analytics = AnalyticsAggregator::new(state.store(), state.clock(), state.offset());
    let dashboard = analytics
        .dashboard(&lots, query.period, query.generation)
        .await?;

    Ok(Json(dashboard))
}
