//! Styled Excel export of a [`Report`].
//!
//! Layout of sheet `Командировки`:
//!
//! ```text
//! № | Шофьор | Камион | Дата от | Дата до | Дни | EUR/ден | Сума EUR | Сума BGN
//! ```
//!
//! The `Шофьор` column exists only in the driver view. Each section is
//! followed by a grey "За получаване" subtotal row; the last row holds the
//! grand total.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::info;

use perdiem_core::error::{PerDiemError, Result};
use perdiem_core::formatting::format_date;

use crate::rows::{Report, ReportRow, Totals, GRAND_TOTAL_LABEL, SUBTOTAL_LABEL};

/// Name of the only worksheet.
pub const SHEET_NAME: &str = "Командировки";

const HEADER_BLUE: u32 = 0x4472C4;
const SUBTOTAL_GREY: u32 = 0xE7E6E6;
const MONEY_FORMAT: &str = "#,##0.00";

/// Column positions for one of the two layouts.
struct Columns {
    group: Option<u16>,
    vehicle: u16,
    start: u16,
    end: u16,
    days: u16,
    rate: u16,
    eur: u16,
    bgn: u16,
}

impl Columns {
    fn for_report(report: &Report) -> Self {
        let shift = u16::from(report.has_mapping);
        Self {
            group: report.has_mapping.then_some(1),
            vehicle: 1 + shift,
            start: 2 + shift,
            end: 3 + shift,
            days: 4 + shift,
            rate: 5 + shift,
            eur: 6 + shift,
            bgn: 7 + shift,
        }
    }

    fn last(&self) -> u16 {
        self.bgn
    }
}

struct Styles {
    header: Format,
    cell: Format,
    label: Format,
    money: Format,
    subtotal: Format,
    subtotal_money: Format,
}

impl Styles {
    fn new() -> Self {
        let cell = Format::new().set_border(FormatBorder::Thin);
        let subtotal = cell
            .clone()
            .set_bold()
            .set_background_color(Color::RGB(SUBTOTAL_GREY));
        Self {
            header: cell
                .clone()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(HEADER_BLUE))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            label: cell.clone().set_bold().set_align(FormatAlign::Left),
            money: cell.clone().set_num_format(MONEY_FORMAT),
            subtotal_money: subtotal.clone().set_num_format(MONEY_FORMAT),
            subtotal,
            cell: cell.set_align(FormatAlign::Center),
        }
    }
}

/// Write `report` to `path` as a styled workbook.
pub fn write_xlsx(report: &Report, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    fill_sheet(sheet, report).map_err(export_error)?;
    workbook.save(path).map_err(export_error)?;

    info!(
        "Exported {} blocks to {}",
        report.totals.blocks,
        path.display()
    );
    Ok(())
}

fn export_error(e: XlsxError) -> PerDiemError {
    PerDiemError::Export(e.to_string())
}

fn fill_sheet(sheet: &mut Worksheet, report: &Report) -> std::result::Result<(), XlsxError> {
    let cols = Columns::for_report(report);
    let styles = Styles::new();

    sheet.set_name(SHEET_NAME)?;

    let headers: &[&str] = if report.has_mapping {
        &["№", "Шофьор", "Камион", "Дата от", "Дата до", "Дни", "EUR/ден", "Сума EUR", "Сума BGN"]
    } else {
        &["№", "Камион", "Дата от", "Дата до", "Дни", "EUR/ден", "Сума EUR", "Сума BGN"]
    };
    for (col, title) in (0u16..).zip(headers) {
        sheet.write_string_with_format(0, col, *title, &styles.header)?;
    }

    let mut row_num: u32 = 1;
    for section in &report.sections {
        for (i, row) in section.rows.iter().enumerate() {
            // The group label is shown once, on the section's first row.
            let group_label = (i == 0).then_some(section.label.as_str());
            write_block_row(sheet, &cols, &styles, row_num, row, group_label)?;
            row_num += 1;
        }
        write_totals_row(
            sheet,
            &cols,
            &styles,
            row_num,
            SUBTOTAL_LABEL,
            &section.subtotal,
            report.has_mapping,
        )?;
        row_num += 1;
    }
    if !report.is_empty() {
        write_totals_row(
            sheet,
            &cols,
            &styles,
            row_num,
            GRAND_TOTAL_LABEL,
            &report.totals,
            report.has_mapping,
        )?;
    }

    sheet.set_column_width(0, 5)?;
    sheet.set_column_width(1, 20)?;
    for col in 2..=4 {
        sheet.set_column_width(col, 12)?;
    }
    Ok(())
}

fn write_block_row(
    sheet: &mut Worksheet,
    cols: &Columns,
    styles: &Styles,
    row_num: u32,
    row: &ReportRow,
    group_label: Option<&str>,
) -> std::result::Result<(), XlsxError> {
    sheet.write_number_with_format(row_num, 0, row.block_num as f64, &styles.cell)?;

    let label = group_label.unwrap_or("");
    match cols.group {
        Some(col) => {
            sheet.write_string_with_format(row_num, col, label, &styles.label)?;
            sheet.write_string_with_format(row_num, cols.vehicle, &row.vehicle_id, &styles.cell)?;
        }
        // Per-vehicle layout: the vehicle column doubles as the group label.
        None => {
            sheet.write_string_with_format(row_num, cols.vehicle, label, &styles.label)?;
        }
    }

    sheet.write_string_with_format(row_num, cols.start, format_date(row.start_time), &styles.cell)?;
    sheet.write_string_with_format(row_num, cols.end, format_date(row.end_time), &styles.cell)?;
    sheet.write_number_with_format(row_num, cols.days, row.days, &styles.cell)?;
    sheet.write_number_with_format(row_num, cols.rate, row.eur_rate, &styles.cell)?;
    sheet.write_number_with_format(row_num, cols.eur, row.eur_sum, &styles.money)?;
    sheet.write_number_with_format(row_num, cols.bgn, row.bgn_sum, &styles.money)?;
    Ok(())
}

fn write_totals_row(
    sheet: &mut Worksheet,
    cols: &Columns,
    styles: &Styles,
    row_num: u32,
    label: &str,
    totals: &Totals,
    merge_label: bool,
) -> std::result::Result<(), XlsxError> {
    let first_value_col = if merge_label {
        sheet.merge_range(row_num, 0, row_num, 1, label, &styles.subtotal)?;
        2
    } else {
        // Single-cell merges are rejected by the writer.
        sheet.write_string_with_format(row_num, 0, label, &styles.subtotal)?;
        1
    };
    for col in first_value_col..=cols.last() {
        sheet.write_blank(row_num, col, &styles.subtotal)?;
    }
    sheet.write_number_with_format(row_num, cols.days, totals.days, &styles.subtotal)?;
    sheet.write_number_with_format(row_num, cols.eur, totals.eur, &styles.subtotal_money)?;
    sheet.write_number_with_format(row_num, cols.bgn, totals.bgn, &styles.subtotal_money)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
