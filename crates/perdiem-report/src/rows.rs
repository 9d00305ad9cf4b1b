//! Flat report rows built from an [`AnalysisResult`].
//!
//! Each travel block becomes one [`ReportRow`] with its amounts already
//! resolved against a [`RateTable`]. Rows are grouped into sections (one per
//! driver, or per vehicle when no mapping was given) carrying subtotals.

use chrono::NaiveDateTime;
use serde::Serialize;

use perdiem_core::formatting::format_timestamp;
use perdiem_core::models::TravelBlock;
use perdiem_core::rates::RateTable;
use perdiem_data::analysis::{AnalysisResult, ReportView};

/// Label of a section's subtotal line.
pub const SUBTOTAL_LABEL: &str = "За получаване";

/// Label of the grand total line.
pub const GRAND_TOTAL_LABEL: &str = "Общо";

/// One travel block, priced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Driver name; `None` in the per-vehicle view.
    pub driver: Option<String>,
    pub vehicle_id: String,
    /// 1-based position within the section.
    pub block_num: usize,
    /// Start rendered as `dd.mm.yyyy HH:MM`.
    pub start_date: String,
    pub end_date: String,
    #[serde(skip)]
    pub start_time: NaiveDateTime,
    #[serde(skip)]
    pub end_time: NaiveDateTime,
    /// Destination country label.
    pub country: String,
    pub days: u32,
    pub eur_rate: f64,
    pub eur_sum: f64,
    pub bgn_sum: f64,
    pub records_count: usize,
}

/// Running sums over a set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub days: u32,
    pub eur: f64,
    pub bgn: f64,
    pub blocks: usize,
}

impl Totals {
    fn add(&mut self, row: &ReportRow) {
        self.days += row.days;
        self.eur += row.eur_sum;
        self.bgn += row.bgn_sum;
        self.blocks += 1;
    }

    fn merge(&mut self, other: &Totals) {
        self.days += other.days;
        self.eur += other.eur;
        self.bgn += other.bgn;
        self.blocks += other.blocks;
    }
}

/// Rows of one driver (or vehicle) plus their subtotal.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub label: String,
    pub rows: Vec<ReportRow>,
    pub subtotal: Totals,
}

/// The whole priced report.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// `true` when rows are grouped by driver.
    pub has_mapping: bool,
    pub sections: Vec<ReportSection>,
    pub totals: Totals,
}

impl Report {
    /// All rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.sections.iter().flat_map(|s| s.rows.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Price every block of `result` and lay the rows out by section.
///
/// Driver sections follow the group order (named drivers alphabetically,
/// Unassigned last); vehicle sections follow vehicle id order and skip
/// vehicles without blocks.
pub fn build_report(result: &AnalysisResult, rates: &RateTable) -> Report {
    let sections: Vec<ReportSection> = match &result.view {
        ReportView::ByDriver(grouping) => grouping
            .groups
            .iter()
            .map(|(group, entries)| {
                let label = group.label().to_string();
                section(
                    &label,
                    entries
                        .iter()
                        .map(|e| (Some(label.as_str()), e.vehicle_id.as_str(), &e.block)),
                    rates,
                )
            })
            .collect(),
        ReportView::ByVehicle(blocks) => blocks
            .iter()
            .filter(|(_, b)| !b.is_empty())
            .map(|(vehicle, b)| {
                section(
                    vehicle,
                    b.iter().map(|block| (None, vehicle.as_str(), block)),
                    rates,
                )
            })
            .collect(),
    };

    let mut totals = Totals::default();
    for s in &sections {
        totals.merge(&s.subtotal);
    }

    Report {
        has_mapping: matches!(result.view, ReportView::ByDriver(_)),
        sections,
        totals,
    }
}

fn section<'a>(
    label: &str,
    blocks: impl Iterator<Item = (Option<&'a str>, &'a str, &'a TravelBlock)>,
    rates: &RateTable,
) -> ReportSection {
    let mut subtotal = Totals::default();
    let rows: Vec<ReportRow> = blocks
        .enumerate()
        .map(|(i, (driver, vehicle, block))| {
            let row = price(i + 1, driver, vehicle, block, rates);
            subtotal.add(&row);
            row
        })
        .collect();

    ReportSection {
        label: label.to_string(),
        rows,
        subtotal,
    }
}

fn price(
    block_num: usize,
    driver: Option<&str>,
    vehicle: &str,
    block: &TravelBlock,
    rates: &RateTable,
) -> ReportRow {
    let eur_sum = rates.amount_eur(block);
    ReportRow {
        driver: driver.map(str::to_string),
        vehicle_id: vehicle.to_string(),
        block_num,
        start_date: format_timestamp(block.start_time),
        end_date: format_timestamp(block.end_time),
        start_time: block.start_time,
        end_time: block.end_time,
        country: block.destination.label().to_string(),
        days: block.duration_days,
        eur_rate: rates.rate_for(block),
        eur_sum,
        bgn_sum: rates.to_bgn(eur_sum),
        records_count: block.record_count(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
