//! GPS workbook loading.
//!
//! Two tracking systems export trip segments in different `.xlsx` layouts:
//!
//! * **GPS1**: a single sheet with a title block; data starts at spreadsheet
//!   row 9 with columns A truck, B start, C end, D from-address, E to-address.
//!   A trailing `Общо` row holds totals.
//! * **GPS2**: one sheet per truck named after its registration; header on
//!   row 1, data from row 2 with C start-address, E start-time, K end-address,
//!   M end-time. Timestamps are day-first strings.
//!
//! Both are normalised into [`MovementRecord`]s. A row whose timestamps cannot
//! be parsed is dropped and counted; it never fails the whole file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook, Data, DataType, Range, Reader, Xlsx};
use chrono::NaiveDateTime;
use perdiem_core::error::{PerDiemError, Result};
use perdiem_core::models::{MovementRecord, SourceSystem};
use perdiem_core::timestamps::{TimestampProcessor, GPS1_FORMATS, GPS2_FORMATS};
use tracing::{debug, warn};

/// Zero-based index of the first GPS1 data row (spreadsheet row 9).
const GPS1_FIRST_ROW: u32 = 8;
const GPS1_WIDTH: u32 = 5;
const GPS1_TOTALS_MARKER: &str = "Общо";

/// Zero-based index of the first GPS2 data row (spreadsheet row 2).
const GPS2_FIRST_ROW: u32 = 1;
const GPS2_WIDTH: u32 = 13;

mod gps2_col {
    pub const START_ADDRESS: usize = 2;
    pub const START_TIME: usize = 4;
    pub const END_ADDRESS: usize = 10;
    pub const END_TIME: usize = 12;
}

// ── Public types ──────────────────────────────────────────────────────────────

/// Records read from one or more exports, plus the count of dropped rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<MovementRecord>,
    pub skipped_rows: usize,
}

impl NormalizedBatch {
    pub fn extend(&mut self, other: NormalizedBatch) {
        self.records.extend(other.records);
        self.skipped_rows += other.skipped_rows;
    }

    fn push(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Record(record) => self.records.push(record),
            RowOutcome::Blank => {}
            RowOutcome::Skipped(reason) => {
                debug!("Skipping row: {}", reason);
                self.skipped_rows += 1;
            }
        }
    }
}

/// What a single spreadsheet row turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Record(MovementRecord),
    /// Padding, header or totals row: not data, not an error.
    Blank,
    /// Data row that could not be parsed.
    Skipped(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a GPS1 export. Only the first worksheet is read.
pub fn load_gps1(path: &Path) -> Result<NormalizedBatch> {
    let mut workbook = open(path)?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        warn!("GPS1 workbook {} has no sheets", path.display());
        return Ok(NormalizedBatch::default());
    };
    let range = sheet_range(&mut workbook, path, &sheet)?;

    let mut batch = NormalizedBatch::default();
    for row in absolute_rows(&range, GPS1_FIRST_ROW, GPS1_WIDTH) {
        batch.push(gps1_row(&row));
    }

    debug!(
        "GPS1 {}: {} records, {} skipped",
        path.display(),
        batch.records.len(),
        batch.skipped_rows
    );
    Ok(batch)
}

/// Load a GPS2 export, one truck per worksheet.
pub fn load_gps2(path: &Path) -> Result<NormalizedBatch> {
    let mut workbook = open(path)?;
    let mut batch = NormalizedBatch::default();

    for sheet in workbook.sheet_names() {
        let vehicle = sheet.trim().to_string();
        if vehicle.is_empty() {
            continue;
        }
        let range = sheet_range(&mut workbook, path, &sheet)?;
        let before = batch.records.len();
        for row in absolute_rows(&range, GPS2_FIRST_ROW, GPS2_WIDTH) {
            batch.push(gps2_row(&vehicle, &row));
        }
        debug!(
            "GPS2 sheet {}: {} records",
            vehicle,
            batch.records.len() - before
        );
    }

    debug!(
        "GPS2 {}: {} records, {} skipped",
        path.display(),
        batch.records.len(),
        batch.skipped_rows
    );
    Ok(batch)
}

/// Interpret one GPS1 row (columns A–E, zero-based).
pub fn gps1_row(row: &[Data]) -> RowOutcome {
    let Some(vehicle) = row.first().and_then(cell_text) else {
        return RowOutcome::Blank;
    };
    if vehicle == GPS1_TOTALS_MARKER {
        return RowOutcome::Blank;
    }

    let times = cell_timestamp(row.get(1), GPS1_FORMATS)
        .and_then(|start| cell_timestamp(row.get(2), GPS1_FORMATS).map(|end| (start, end)));
    let (start, end) = match times {
        Ok(t) => t,
        Err(e) => return RowOutcome::Skipped(format!("GPS1 {}: {}", vehicle, e)),
    };

    RowOutcome::Record(MovementRecord::from_addresses(
        vehicle,
        start,
        end,
        row.get(3).and_then(cell_text),
        row.get(4).and_then(cell_text),
        SourceSystem::Gps1,
    ))
}

/// Interpret one GPS2 row of the sheet belonging to `vehicle`.
pub fn gps2_row(vehicle: &str, row: &[Data]) -> RowOutcome {
    let start_cell = row.get(gps2_col::START_TIME);
    if start_cell.map_or(true, is_blank) {
        return RowOutcome::Blank;
    }

    let times = cell_timestamp(start_cell, GPS2_FORMATS).and_then(|start| {
        cell_timestamp(row.get(gps2_col::END_TIME), GPS2_FORMATS).map(|end| (start, end))
    });
    let (start, end) = match times {
        Ok(t) => t,
        Err(e) => return RowOutcome::Skipped(format!("GPS2 {}: {}", vehicle, e)),
    };

    RowOutcome::Record(MovementRecord::from_addresses(
        vehicle,
        start,
        end,
        row.get(gps2_col::START_ADDRESS).and_then(cell_text),
        row.get(gps2_col::END_ADDRESS).and_then(cell_text),
        SourceSystem::Gps2,
    ))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn open(path: &Path) -> Result<Xlsx<BufReader<File>>> {
    if !path.exists() {
        return Err(PerDiemError::MissingInput(format!(
            "workbook {}",
            path.display()
        )));
    }
    open_workbook(path).map_err(|e: calamine::XlsxError| PerDiemError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn sheet_range(
    workbook: &mut Xlsx<BufReader<File>>,
    path: &Path,
    sheet: &str,
) -> Result<Range<Data>> {
    workbook
        .worksheet_range(sheet)
        .map_err(|e| PerDiemError::Workbook {
            path: path.to_path_buf(),
            message: format!("sheet {}: {}", sheet, e),
        })
}

/// Materialise rows `first_row..` of `range` as fixed-width vectors indexed by
/// absolute column, so column letters map to the same index whatever the used
/// area of the sheet is.
fn absolute_rows(range: &Range<Data>, first_row: u32, width: u32) -> Vec<Vec<Data>> {
    let (Some((start_row, _)), Some((end_row, _))) = (range.start(), range.end()) else {
        return Vec::new();
    };
    (first_row.max(start_row)..=end_row)
        .map(|r| {
            (0..width)
                .map(|c| range.get_value((r, c)).cloned().unwrap_or(Data::Empty))
                .collect()
        })
        .collect()
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Trimmed text content of a cell; `None` for empty cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        other => Some(other.to_string()),
    }
}

/// Read a timestamp from a date cell or a string cell in one of `formats`.
fn cell_timestamp(cell: Option<&Data>, formats: &[&str]) -> Result<NaiveDateTime> {
    match cell {
        None | Some(Data::Empty) => Err(PerDiemError::TimestampParse(String::new())),
        Some(Data::String(s)) => TimestampProcessor::parse(s, formats),
        Some(other) => other
            .as_datetime()
            .ok_or_else(|| PerDiemError::TimestampParse(other.to_string())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
