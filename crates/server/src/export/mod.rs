//! Report exporters.
//!
//! Both renderers consume the same [`Report`](crate::services::reports::Report)
//! and produce a downloadable [`Artifact`]:
//!
//! - `xlsx` - single-sheet workbook with a styled title block and table
//! - `pdf` - A4 document with metadata lines and a striped table
//! - JSON - the serialized report, for offline exports
//!
//! Artifacts are rendered on the request task and never persisted.

pub mod pdf;
pub mod xlsx;

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::services::reports::Report;

/// Errors raised while rendering an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("spreadsheet rendering failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("pdf rendering failed: {0}")]
    Pdf(String),

    #[error("json rendering failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output format of a report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Xlsx,
    Pdf,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
        }
    }

    /// MIME type of the rendered artifact.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("unknown export format {other:?}")),
        }
    }
}

/// A rendered file ready to be downloaded.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Render `report` as a downloadable file.
///
/// # Errors
///
/// Returns `ExportError` if the renderer fails.
pub fn render(report: &Report, format: ExportFormat) -> Result<Artifact, ExportError> {
    let bytes = match format {
        ExportFormat::Xlsx => xlsx::render(report)?,
        ExportFormat::Pdf => pdf::render(report)?,
        ExportFormat::Json => serde_json::to_vec_pretty(report)?,
    };
    Ok(Artifact {
        file_name: file_name(&report.lot_name, report.generated_at, report.offset, format),
        content_type: format.content_type(),
        bytes,
    })
}

// =============================================================================
// Formatting shared by the renderers
// =============================================================================

/// `dd/MM/yyyy HH:mm` in local time.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%d/%m/%Y %H:%M").to_string()
}

/// `dd/MM/yyyy HH:mm`, or `-` for a vehicle that has not left.
#[must_use]
pub fn format_exit(exit: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    exit.map_or_else(|| "-".to_string(), |at| format_timestamp(at, offset))
}

/// `dd/MM/yyyy até dd/MM/yyyy`.
#[must_use]
pub fn format_period(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{} até {}",
        start.format("%d/%m/%Y"),
        end.format("%d/%m/%Y")
    )
}

/// `dd/MM/yyyy às HH:mm` in local time.
#[must_use]
pub fn format_generated_at(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset)
        .format("%d/%m/%Y às %H:%M")
        .to_string()
}

/// `relatorio-{lot}-{dd-MM-yyyy-HH-mm}.{ext}`.
///
/// Path separators and control characters in the lot name are replaced so
/// the name is always a single path component.
#[must_use]
pub fn file_name(
    lot_name: &str,
    generated_at: DateTime<Utc>,
    offset: FixedOffset,
    format: ExportFormat,
) -> String {
    let lot: String = lot_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | '"') {
                '-'
            } else {
                c
            }
        })
        .collect();
    let stamp = generated_at.with_timezone(&offset).format("%d-%m-%Y-%H-%M");
    format!("relatorio-{lot}-{stamp}.{}", format.extension())
}

/// `Content-Disposition` value with an ASCII fallback and an RFC 5987
/// UTF-8 name.
#[must_use]
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = fold_to_ascii(file_name)
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

/// Replace Portuguese diacritics with their base letters.
///
/// Builtin PDF fonts only cover a Latin-1 subset; other non-ASCII
/// characters become `?`.
#[must_use]
pub fn fold_to_ascii(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}
