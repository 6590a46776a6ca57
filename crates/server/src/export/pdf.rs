//! PDF export.
//!
//! A4 portrait pages: a title, four metadata lines and a striped table whose
//! column widths are laid out from the content. Cells too long for their
//! column wrap onto extra lines. Rows that do not fit flow onto new pages,
//! each repeating the table header.

use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rect, Rgb,
};

use super::{
    ExportError, fold_to_ascii, format_exit, format_generated_at, format_period,
    format_timestamp,
};
use crate::services::reports::Report;

pub const TITLE: &str = "Relatório de Movimentação de Veículos";
pub const HEADERS: [&str; 5] = ["Placa", "Condutor", "Entrada", "Saída", "Tempo"];

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 14.0;
const LAYER: &str = "Camada 1";

const TITLE_SIZE: f32 = 16.0;
const TEXT_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 9.0;
const ROW_HEIGHT: f32 = 7.0;
/// Extra height per wrapped line.
const LINE_HEIGHT: f32 = 4.0;
const CELL_PADDING: f32 = 1.5;
/// Cap on a column's natural width before scaling, so one long cell does
/// not squeeze the others.
const MAX_COLUMN_WIDTH: f32 = 60.0;

/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;
const PT_TO_MM: f32 = 0.352_778;

const HEADER_FILL: (f32, f32, f32) = (59.0 / 255.0, 130.0 / 255.0, 246.0 / 255.0);
const STRIPE_FILL: (f32, f32, f32) = (0.96, 0.96, 0.96);

/// Render the report as a PDF document.
///
/// # Errors
///
/// Returns `ExportError::Pdf` if fonts cannot be registered or the document
/// cannot be serialized.
pub fn render(report: &Report) -> Result<Vec<u8>, ExportError> {
    let (doc, page, layer) = PdfDocument::new(
        fold_to_ascii(TITLE),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        LAYER,
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;
    let fonts = Fonts { regular, bold };

    let mut canvas = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT - MARGIN - 6.0;

    write_text(&canvas, TITLE, TITLE_SIZE, MARGIN, y, &fonts.bold);
    y -= 10.0;

    let metadata = [
        format!("Estacionamento: {}", report.lot_name),
        format!("Período: {}", format_period(report.start, report.end)),
        format!("Gerado por: {}", report.generated_by),
        format!(
            "Data de geração: {}",
            format_generated_at(report.generated_at, report.offset)
        ),
    ];
    for line in &metadata {
        write_text(&canvas, line, TEXT_SIZE, MARGIN, y, &fonts.regular);
        y -= 6.0;
    }
    y -= 4.0;

    let rows: Vec<[String; 5]> = report
        .rows
        .iter()
        .map(|record| {
            let v = &record.vehicle;
            [
                v.plate.to_string(),
                v.driver.clone(),
                format_timestamp(v.entry_time, report.offset),
                format_exit(v.exit_time, report.offset),
                record.duration.to_string(),
            ]
        })
        .collect();

    let table = TableLayout::fit(&HEADERS, &rows, PAGE_WIDTH - 2.0 * MARGIN, TABLE_SIZE);

    draw_header_row(&canvas, &table, y, &fonts);
    y -= ROW_HEIGHT;

    for (index, row) in rows.iter().enumerate() {
        let cells = table.wrap_row(row);
        let height = row_height(&cells);
        if y - (height - ROW_HEIGHT) < MARGIN + ROW_HEIGHT {
            canvas = new_page(&doc);
            y = PAGE_HEIGHT - MARGIN - ROW_HEIGHT;
            draw_header_row(&canvas, &table, y, &fonts);
            y -= ROW_HEIGHT;
        }
        if index % 2 == 1 {
            fill_rect(&canvas, MARGIN, y, table.total_width(), height, STRIPE_FILL);
        }
        draw_cells(&canvas, &table, &cells, y, &fonts.regular);
        y -= height;
    }

    doc.save_to_bytes().map_err(pdf_error)
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

#[allow(clippy::needless_pass_by_value)]
fn pdf_error(e: printpdf::Error) -> ExportError {
    ExportError::Pdf(format!("{e:?}"))
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
    doc.get_page(page).get_layer(layer)
}

fn write_text(
    canvas: &PdfLayerReference,
    text: &str,
    size: f32,
    x: f32,
    y: f32,
    font: &IndirectFontRef,
) {
    canvas.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    canvas.use_text(fold_to_ascii(text), size, Mm(x), Mm(y), font);
}

/// Height of a row whose tallest cell has the most wrapped lines.
fn row_height(cells: &[Vec<String>]) -> f32 {
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    #[allow(clippy::cast_precision_loss)]
    let extra = (lines - 1) as f32;
    ROW_HEIGHT + extra * LINE_HEIGHT
}

/// Fill a band `height` mm tall whose top matches a row with its first
/// baseline at `y`.
fn fill_rect(
    canvas: &PdfLayerReference,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    rgb: (f32, f32, f32),
) {
    canvas.set_fill_color(Color::Rgb(Rgb::new(rgb.0, rgb.1, rgb.2, None)));
    let top = y - 2.0 + ROW_HEIGHT;
    let rect = Rect::new(Mm(x), Mm(top - height), Mm(x + width), Mm(top))
        .with_mode(PaintMode::Fill);
    canvas.add_rect(rect);
}

fn draw_header_row(canvas: &PdfLayerReference, table: &TableLayout, y: f32, fonts: &Fonts) {
    fill_rect(canvas, MARGIN, y, table.total_width(), ROW_HEIGHT, HEADER_FILL);
    let mut x = MARGIN;
    for (header, width) in HEADERS.iter().zip(&table.widths) {
        canvas.set_fill_color(Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None)));
        canvas.use_text(
            fold_to_ascii(header),
            TABLE_SIZE,
            Mm(x + CELL_PADDING),
            Mm(y),
            &fonts.bold,
        );
        x += width;
    }
}

fn draw_cells(
    canvas: &PdfLayerReference,
    table: &TableLayout,
    cells: &[Vec<String>],
    y: f32,
    font: &IndirectFontRef,
) {
    let mut x = MARGIN;
    for (lines, width) in cells.iter().zip(&table.widths) {
        let mut baseline = y;
        for line in lines {
            write_text(canvas, line, TABLE_SIZE, x + CELL_PADDING, baseline, font);
            baseline -= LINE_HEIGHT;
        }
        x += width;
    }
}

// =============================================================================
// Table auto-layout
// =============================================================================

/// Column widths (mm) computed from the widest cell of each column.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub widths: Vec<f32>,
    font_size: f32,
}

impl TableLayout {
    /// Size columns in proportion to their widest content, scaled to fill
    /// `available` mm exactly.
    #[must_use]
    pub fn fit<const N: usize>(
        headers: &[&str; N],
        rows: &[[String; N]],
        available: f32,
        font_size: f32,
    ) -> Self {
        let natural: Vec<f32> = (0..N)
            .map(|col| {
                let widest = rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.chars().count())
                    .chain(headers.get(col).map(|h| h.chars().count()))
                    .max()
                    .unwrap_or(0);
                (text_width(widest, font_size) + 2.0 * CELL_PADDING).min(MAX_COLUMN_WIDTH)
            })
            .collect();

        let total: f32 = natural.iter().sum();
        let widths = if total > 0.0 {
            natural.iter().map(|w| w / total * available).collect()
        } else {
            #[allow(clippy::cast_precision_loss)]
            let even = available / N.max(1) as f32;
            vec![even; N]
        };
        Self { widths, font_size }
    }

    /// Sum of the column widths.
    #[must_use]
    pub fn total_width(&self) -> f32 {
        self.widths.iter().sum()
    }

    /// Wrap every cell of `row` to its column.
    #[must_use]
    pub fn wrap_row(&self, row: &[String]) -> Vec<Vec<String>> {
        row.iter()
            .zip(&self.widths)
            .map(|(text, width)| self.wrap(text, *width))
            .collect()
    }

    /// Break `text` into lines that fit a column of `width` mm, at spaces
    /// where possible. Words longer than a line are split. Always returns
    /// at least one line.
    #[must_use]
    pub fn wrap(&self, text: &str, width: f32) -> Vec<String> {
        let room = width - 2.0 * CELL_PADDING;
        let per_line = (1..)
            .take_while(|&n| text_width(n, self.font_size) <= room)
            .last()
            .unwrap_or(1);

        let mut lines = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;
        for word in text.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > per_line {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = chars.split_off(per_line);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }

            if current_len > 0 && current_len + 1 + chars.len() > per_line {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += chars.len();
            current.extend(chars);
        }
        if current_len > 0 || lines.is_empty() {
            lines.push(current);
        }
        lines
    }
}

/// Approximate printed width in mm of `chars` glyphs.
fn text_width(chars: usize, font_size: f32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let chars = chars as f32;
    chars * font_size * AVG_GLYPH_EM * PT_TO_MM
}
