//! JSON output: `{ "success": true, "stats": …, "data": [rows…] }`.

use serde::Serialize;

use perdiem_core::error::Result;
use perdiem_data::aggregator::RunStatistics;

use crate::rows::{Report, ReportRow, Totals};

#[derive(Serialize)]
struct JsonReport<'a> {
    success: bool,
    stats: &'a RunStatistics,
    data: Vec<&'a ReportRow>,
    totals: &'a Totals,
}

/// Serialise the report rows and run statistics as pretty-printed JSON.
pub fn render_json(report: &Report, stats: &RunStatistics) -> Result<String> {
    let payload = JsonReport {
        success: true,
        stats,
        data: report.rows().collect(),
        totals: &report.totals,
    };
    Ok(serde_json::to_string_pretty(&payload)?)
}
