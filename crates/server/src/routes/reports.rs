//! Report route handler.
//!
//! `format=json` (the default) returns the rows inline; `xlsx` and `pdf`
//! are sent as attachments named `relatorio-{lot}-{dd-MM-yyyy-HH-mm}`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use garagem_core::ParkingLotId;

use crate::error::{AppError, add_breadcrumb};
use crate::export::{self, ExportFormat};
use crate::middleware::RequireAuth;
use crate::services::{ParkingLotRegistry, ReportAggregator, ServiceError};
use crate::state::AppState;

/// Report query: `?start=YYYY-MM-DD&end=YYYY-MM-DD[&format=json|xlsx|pdf]`.
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub format: ExportFormat,
}

/// Build a report for the lot and date range.
///
/// # Errors
///
/// Returns `400` for an inverted range, `403` without access to the lot and
/// `500` if rendering fails.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(lot_id): Path<ParkingLotId>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    let lot = ParkingLotRegistry::new(state.store(), state.clock())
        .ensure_access(lot_id, &user)
        .await?;

    let generated_by = match state.store().user_by_id(user.id).await? {
        Some(profile) => profile.display_name().to_owned(),
        None => user.email.as_str().to_owned(),
    };

    let report = ReportAggregator::new(state.store(), state.clock(), state.offset())
        .build(lot.id, query.start, query.end, &generated_by)
        .await?;

    if query.format == ExportFormat::Json {
        return Ok(Json(report).into_response());
    }

    let artifact = export::render(&report, query.format).map_err(ServiceError::from)?;
    add_breadcrumb(
        "reports",
        "Report exported",
        Some(&[("file_name", artifact.file_name.as_str())]),
    );

    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                export::content_disposition(&artifact.file_name),
            ),
        ],
        artifact.bytes,
    )
        .into_response())
}
