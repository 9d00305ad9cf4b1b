//! Plain-text rendering of a [`Report`] for the terminal.
//!
//! One line per block, a subtotal line after each section and a grand total
//! at the bottom, followed by a short statistics summary.

use std::fmt::Write;

use perdiem_core::formatting::{format_amount, format_number};
use perdiem_data::aggregator::RunStatistics;

use crate::rows::{Report, ReportRow, Totals, GRAND_TOTAL_LABEL, SUBTOTAL_LABEL};

const HEADERS: [&str; 9] = [
    "№", "Камион", "Дата от", "Дата до", "Държава", "Дни", "EUR/ден", "Сума EUR", "Сума BGN",
];

const WIDTHS: [usize; 9] = [3, 10, 16, 16, 22, 4, 8, 14, 14];

const GROUP_WIDTH: usize = 24;

/// Render the report table, or a short notice when there is nothing to bill.
pub fn render_table(report: &Report) -> String {
    let mut out = String::new();

    if report.is_empty() {
        out.push_str("Няма командировки за периода.\n");
        return out;
    }

    let group_header = if report.has_mapping { "Шофьор" } else { "Група" };
    let header = std::iter::once(pad(group_header, GROUP_WIDTH, false))
        .chain(
            HEADERS
                .iter()
                .zip(WIDTHS)
                .enumerate()
                .map(|(i, (h, w))| pad(h, w, i >= 5)),
        )
        .collect::<Vec<_>>()
        .join(" ");
    let rule = "─".repeat(header.chars().count());

    let _ = writeln!(out, "{}", header);
    let _ = writeln!(out, "{}", rule);

    for section in &report.sections {
        for (i, row) in section.rows.iter().enumerate() {
            let group = if i == 0 { plain_label(&section.label) } else { "" };
            let _ = writeln!(out, "{}", row_line(group, row));
        }
        let _ = writeln!(out, "{}", totals_line(SUBTOTAL_LABEL, &section.subtotal));
        let _ = writeln!(out, "{}", rule);
    }

    let _ = writeln!(out, "{}", totals_line(GRAND_TOTAL_LABEL, &report.totals));
    out
}

/// Statistics summary with warnings for unmapped vehicles and orphaned
/// returns.
pub fn render_summary(stats: &RunStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Записи: {} (в чужбина: {}, {}%)",
        stats.total_records,
        stats.abroad_records,
        format_number(stats.abroad_percentage, 1)
    );
    let _ = writeln!(
        out,
        "Камиони: {} (с командировки: {}), командировки: {}",
        stats.total_vehicles, stats.vehicles_with_travel, stats.total_blocks
    );
    if let Some(drivers) = stats.total_drivers {
        let _ = writeln!(out, "Шофьори: {}", drivers);
    }
    if stats.skipped_rows > 0 {
        let _ = writeln!(out, "Пропуснати редове: {}", stats.skipped_rows);
    }
    if let Some(unmapped) = stats.unmapped_vehicles.as_ref().filter(|u| !u.is_empty()) {
        let _ = writeln!(out, "⚠ Камиони без шофьор: {}", unmapped.join(", "));
    }
    if stats.orphaned_returns > 0 {
        let _ = writeln!(
            out,
            "⚠ Завръщания без отпътуване: {}",
            stats.orphaned_returns
        );
    }
    out
}

fn row_line(group: &str, row: &ReportRow) -> String {
    let cells = [
        row.block_num.to_string(),
        row.vehicle_id.clone(),
        row.start_date.clone(),
        row.end_date.clone(),
        row.country.clone(),
        row.days.to_string(),
        format_number(row.eur_rate, 2),
        format_number(row.eur_sum, 2),
        format_number(row.bgn_sum, 2),
    ];
    std::iter::once(pad(group, GROUP_WIDTH, false))
        .chain(
            cells
                .iter()
                .zip(WIDTHS)
                .enumerate()
                .map(|(i, (c, w))| pad(c, w, i == 0 || i >= 5)),
        )
        .collect::<Vec<_>>()
        .join(" ")
}

fn totals_line(label: &str, totals: &Totals) -> String {
    format!(
        "{} {} дни, {} блока: {} / {}",
        pad(label, GROUP_WIDTH, false),
        totals.days,
        totals.blocks,
        format_amount(totals.eur, "EUR"),
        format_amount(totals.bgn, "BGN")
    )
}

/// Drop leading symbols such as the warning emoji of the Unassigned label.
/// Emoji render two columns wide and would shift the row.
fn plain_label(label: &str) -> &str {
    label.trim_start_matches(|c: char| !c.is_alphanumeric())
}

/// Pad by character count; text longer than `width` is kept whole.
fn pad(text: &str, width: usize, right: bool) -> String {
    if right {
        format!("{:>width$}", text, width = width)
    } else {
        format!("{:<width$}", text, width = width)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::build_report;
    use crate::rows::tests::sample_result;
    use perdiem_core::models::UNASSIGNED_LABEL;
    use perdiem_core::rates::RateTable;
    use perdiem_data::mapping::DriverMapping;

    #[test]
    fn test_render_table_vehicle_view() {
        let report = build_report(&sample_result(None), &RateTable::default());
        let text = render_table(&report);

        assert!(text.starts_with("Група"));
        assert!(text.contains("CA1234AB"));
        assert!(text.contains("10.01.2024 08:00"));
        assert!(text.contains("Гърция"));
        assert!(text.contains("129.00"));
        assert_eq!(text.matches(SUBTOTAL_LABEL).count(), 2);
        assert!(text.contains("Общо"));
        assert!(text.contains("221.00 EUR"));
    }

    #[test]
    fn test_render_table_driver_view_label_once() {
        let mapping: DriverMapping = [("CA1234AB", "Иван"), ("PB0001AA", "Иван")]
            .into_iter()
            .collect();
        let report = build_report(&sample_result(Some(&mapping)), &RateTable::default());
        let text = render_table(&report);

        assert!(text.starts_with("Шофьор"));
        assert_eq!(text.matches("Иван").count(), 1);
        assert_eq!(text.matches(SUBTOTAL_LABEL).count(), 1);
    }

    #[test]
    fn test_render_table_unassigned_row_stays_aligned() {
        let mapping: DriverMapping = [("PB0001AA", "Яна")].into_iter().collect();
        let report = build_report(&sample_result(Some(&mapping)), &RateTable::default());
        let text = render_table(&report);

        let unassigned = text
            .lines()
            .find(|l| l.starts_with("Неразпределени"))
            .expect("unassigned row");
        assert!(!unassigned.contains('⚠'));

        let named = text.lines().find(|l| l.starts_with("Яна")).expect("named row");
        let vehicle_column = |line: &str, vehicle: &str| {
            let byte = line.find(vehicle).expect("vehicle id");
            line[..byte].chars().count()
        };
        assert_eq!(
            vehicle_column(unassigned, "CA1234AB"),
            vehicle_column(named, "PB0001AA")
        );
    }

    #[test]
    fn test_plain_label() {
        assert_eq!(plain_label(UNASSIGNED_LABEL), "Неразпределени");
        assert_eq!(plain_label("Иван Иванов"), "Иван Иванов");
    }

    #[test]
    fn test_render_table_empty() {
        let report = crate::rows::Report {
            has_mapping: false,
            sections: Vec::new(),
            totals: Totals::default(),
        };
        assert_eq!(render_table(&report), "Няма командировки за периода.\n");
    }

    #[test]
    fn test_render_summary_warnings() {
        let mapping: DriverMapping = [("PB0001AA", "Яна")].into_iter().collect();
        let mut stats = sample_result(Some(&mapping)).statistics;
        stats.orphaned_returns = 2;
        stats.skipped_rows = 3;
        let text = render_summary(&stats);

        assert!(text.contains("Записи: 5 (в чужбина: 2, 40.0%)"));
        assert!(text.contains("Шофьори: 1"));
        assert!(text.contains("Камиони без шофьор: CA1234AB"));
        assert!(text.contains("Завръщания без отпътуване: 2"));
        assert!(text.contains("Пропуснати редове: 3"));
    }

    #[test]
    fn test_render_summary_clean_run_has_no_warnings() {
        let text = render_summary(&sample_result(None).statistics);
        assert!(!text.contains('⚠'));
        assert!(!text.contains("Шофьори"));
    }

    #[test]
    fn test_pad_counts_chars() {
        assert_eq!(pad("Дни", 5, false), "Дни  ");
        assert_eq!(pad("7", 3, true), "  7");
        assert_eq!(pad("длъжен", 3, false), "длъжен");
    }
}
