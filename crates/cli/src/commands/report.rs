//! Offline report export.
//!
//! Builds the same report the API serves and writes it to disk, named
//! `relatorio-{lot}-{dd-MM-yyyy-HH-mm}.{ext}`.
//!
//! # Environment Variables
//!
//! - `GARAGEM_DATABASE_URL` - `PostgreSQL` connection string
//! - `GARAGEM_UTC_OFFSET` - Local offset for day boundaries (default: -03:00)

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use garagem_core::ParkingLotId;
use garagem_server::clock::SystemClock;
use garagem_server::config::{DEFAULT_UTC_OFFSET, parse_utc_offset};
use garagem_server::db::{self, PgRecordStore};
use garagem_server::export::{self, ExportError, ExportFormat};
use garagem_server::services::{ReportAggregator, ServiceError};
use thiserror::Error;

use super::database_url;

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Environment variable has an unusable value.
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// The report could not be built.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// The report could not be rendered.
    #[error("{0}")]
    Export(#[from] ExportError),

    /// The file could not be written.
    #[error("Could not write {file}: {source}", file = .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What to export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub lot: ParkingLotId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub format: ExportFormat,
    pub generated_by: String,
}

/// Build the report and write it into `output_dir`.
///
/// # Errors
///
/// Returns an error if the lot is unknown, the range is inverted, rendering
/// fails or the file cannot be written.
pub async fn export(request: &ExportRequest, output_dir: &Path) -> Result<PathBuf, ReportError> {
    let database_url = database_url().ok_or(ReportError::MissingEnvVar("GARAGEM_DATABASE_URL"))?;
    let offset = parse_utc_offset(
        &std::env::var("GARAGEM_UTC_OFFSET").unwrap_or_else(|_| DEFAULT_UTC_OFFSET.to_string()),
    )
    .map_err(|e| ReportError::InvalidEnvVar("GARAGEM_UTC_OFFSET", e))?;

    let store = PgRecordStore::new(db::create_pool(&database_url).await?);
    let report = ReportAggregator::new(&store, &SystemClock, offset)
        .build(request.lot, request.start, request.end, &request.generated_by)
        .await?;

    let artifact = export::render(&report, request.format)?;
    let path = output_dir.join(&artifact.file_name);
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })?;

    tracing::info!(
        rows = report.rows.len(),
        "Report written to {}",
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_write_error_names_the_file() {
        let err = ReportError::Write {
            path: PathBuf::from("out/relatorio-Centro.xlsx"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert_eq!(
            err.to_string(),
            "Could not write out/relatorio-Centro.xlsx: permission denied"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_service_errors_convert() {
        let err: ReportError = ServiceError::NotFound("Estacionamento").into();
        assert!(matches!(err, ReportError::Service(_)));
    }
}
