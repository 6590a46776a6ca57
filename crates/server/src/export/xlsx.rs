//! Spreadsheet export.
//!
//! Layout of the single `Relatório` sheet (1-based rows):
//!
//! ```text
//! 1      RELATÓRIO DE MOVIMENTAÇÃO DE VEÍCULOS   (merged A:E)
//! 3..6   Estacionamento: / Período: / Gerado por: / Data de geração:
//! 8      PLACA | CONDUTOR | ENTRADA | SAÍDA | TEMPO
//! 9..    one row per vehicle record
//! ```

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use super::{ExportError, format_exit, format_generated_at, format_period, format_timestamp};
use crate::services::reports::Report;

pub const SHEET_NAME: &str = "Relatório";
pub const TITLE: &str = "RELATÓRIO DE MOVIMENTAÇÃO DE VEÍCULOS";
pub const HEADERS: [&str; 5] = ["PLACA", "CONDUTOR", "ENTRADA", "SAÍDA", "TEMPO"];

/// Zero-based row of the table header.
pub const HEADER_ROW: u32 = 7;
/// Zero-based row of the first record.
pub const FIRST_DATA_ROW: u32 = 8;

const COLUMN_WIDTHS: [f64; 5] = [15.0, 30.0, 20.0, 20.0, 15.0];
const HEADER_BLUE: u32 = 0x004F_81BD;
const LABEL_FILL: u32 = 0x00E9_EEF6;

struct Styles {
    title: Format,
    label: Format,
    value: Format,
    header: Format,
    body: Format,
    body_center: Format,
}

impl Styles {
    fn new() -> Self {
        let title = Format::new()
            .set_bold()
            .set_font_size(14)
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(HEADER_BLUE))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        let label = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(LABEL_FILL))
            .set_border(FormatBorder::Thin);
        let value = Format::new().set_border(FormatBorder::Thin);
        let header = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(HEADER_BLUE))
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin);
        let body = Format::new().set_border(FormatBorder::Thin);
        let body_center = Format::new()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Center);

        Self {
            title,
            label,
            value,
            header,
            body,
            body_center,
        }
    }
}

/// Render the report as an `.xlsx` workbook.
///
/// # Errors
///
/// Returns `ExportError::Spreadsheet` if the workbook cannot be written.
pub fn render(report: &Report) -> Result<Vec<u8>, ExportError> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, width) in (0u16..).zip(COLUMN_WIDTHS) {
        sheet.set_column_width(col, width)?;
    }

    sheet.set_row_height(0, 28)?;
    sheet.merge_range(0, 0, 0, 4, TITLE, &styles.title)?;

    write_metadata(sheet, report, &styles)?;

    for (col, header) in (0u16..).zip(HEADERS) {
        sheet.write_string_with_format(HEADER_ROW, col, header, &styles.header)?;
    }

    for (row, record) in (FIRST_DATA_ROW..).zip(&report.rows) {
        let vehicle = &record.vehicle;
        sheet.write_string_with_format(row, 0, vehicle.plate.as_str(), &styles.body_center)?;
        sheet.write_string_with_format(row, 1, &vehicle.driver, &styles.body)?;
        sheet.write_string_with_format(
            row,
            2,
            format_timestamp(vehicle.entry_time, report.offset),
            &styles.body_center,
        )?;
        sheet.write_string_with_format(
            row,
            3,
            format_exit(vehicle.exit_time, report.offset),
            &styles.body_center,
        )?;
        sheet.write_string_with_format(
            row,
            4,
            record.duration.to_string(),
            &styles.body_center,
        )?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_metadata(
    sheet: &mut Worksheet,
    report: &Report,
    styles: &Styles,
) -> Result<(), ExportError> {
    let lines = [
        ("Estacionamento:", report.lot_name.clone()),
        ("Período:", format_period(report.start, report.end)),
        ("Gerado por:", report.generated_by.clone()),
        (
            "Data de geração:",
            format_generated_at(report.generated_at, report.offset),
        ),
    ];

    for (row, (label, value)) in (2u32..).zip(lines) {
        sheet.write_string_with_format(row, 0, label, &styles.label)?;
        sheet.merge_range(row, 1, row, 4, &value, &styles.value)?;
    }
    Ok(())
}
