//! Main per-diem pipeline.
//!
//! Loads the GPS exports and the optional driver mapping, builds travel blocks
//! per vehicle, groups them by driver and returns an [`AnalysisResult`] ready
//! for the report layer.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use perdiem_core::error::Result;
use perdiem_core::models::TravelBlock;
use tracing::{info, warn};

use crate::aggregator::{DriverAggregator, DriverGrouping, RunStatistics};
use crate::builder::TravelBlockBuilder;
use crate::mapping::DriverMapping;
use crate::reader::{load_gps1, load_gps2, NormalizedBatch};

// ── Public types ──────────────────────────────────────────────────────────────

/// Input files of one run.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    /// GPS System 1 export; always required.
    pub gps1: &'a Path,
    pub gps2: Option<&'a Path>,
    pub mapping: Option<&'a Path>,
}

/// How blocks are presented.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportView {
    /// A mapping was supplied: blocks grouped by driver.
    ByDriver(DriverGrouping),
    /// No mapping: blocks per vehicle, vehicles in id order.
    ByVehicle(BTreeMap<String, Vec<TravelBlock>>),
}

/// Timing and provenance of a run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Wall-clock seconds spent reading the input files.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent building and grouping blocks.
    pub transform_time_seconds: f64,
}

/// The complete output of [`analyze`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub view: ReportView,
    pub statistics: RunStatistics,
    pub metadata: AnalysisMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full pipeline over files on disk.
///
/// 1. Load GPS1 (required) and GPS2 (optional) exports.
/// 2. Load the mapping. An unreadable mapping is logged and treated as absent.
/// 3. Build blocks, group, and compute statistics via [`analyze_records`].
pub fn analyze(input: AnalysisInput<'_>) -> Result<AnalysisResult> {
    let load_start = std::time::Instant::now();

    let mut batch = load_gps1(input.gps1)?;
    if let Some(gps2) = input.gps2 {
        batch.extend(load_gps2(gps2)?);
    }

    let mapping = input.mapping.and_then(|path| match DriverMapping::load(path) {
        Ok(m) => Some(m),
        Err(e) => {
            warn!("Ignoring driver mapping: {}", e);
            None
        }
    });
    let load_time = load_start.elapsed().as_secs_f64();

    let transform_start = std::time::Instant::now();
    let (view, statistics) = analyze_records(batch, mapping.as_ref());
    let transform_time = transform_start.elapsed().as_secs_f64();

    info!(
        "Processed {} records from {} vehicles into {} blocks",
        statistics.total_records, statistics.total_vehicles, statistics.total_blocks
    );

    Ok(AnalysisResult {
        view,
        statistics,
        metadata: AnalysisMetadata {
            generated_at: Utc::now().to_rfc3339(),
            load_time_seconds: load_time,
            transform_time_seconds: transform_time,
        },
    })
}

/// Build, group and count an already normalised batch.
///
/// `mapping == None` selects the per-vehicle view; `Some` (even empty)
/// selects the driver view.
pub fn analyze_records(
    batch: NormalizedBatch,
    mapping: Option<&DriverMapping>,
) -> (ReportView, RunStatistics) {
    let NormalizedBatch {
        records,
        skipped_rows,
    } = batch;

    let statistics = RunStatistics::from_records(&records, skipped_rows);
    let built = TravelBlockBuilder::build_all(records);
    let statistics = statistics.with_blocks(&built);
    let blocks = DriverAggregator::into_block_map(built);

    match mapping {
        Some(mapping) => {
            let grouping = DriverAggregator::group_by_driver(blocks, mapping);
            let statistics = statistics.with_grouping(&grouping);
            (ReportView::ByDriver(grouping), statistics)
        }
        None => (ReportView::ByVehicle(blocks), statistics),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use perdiem_core::country::CountryClass::{self, Greece, Home, Turkey};
    use perdiem_core::error::PerDiemError;
    use perdiem_core::models::{DriverGroup, MovementRecord, SourceSystem};
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn rec(vehicle: &str, day: u32, from: CountryClass, to: CountryClass) -> MovementRecord {
        MovementRecord::new(vehicle, at(day, 8), at(day, 16), from, to, SourceSystem::Gps1)
    }

    fn batch(records: Vec<MovementRecord>) -> NormalizedBatch {
        NormalizedBatch {
            records,
            skipped_rows: 0,
        }
    }

    fn two_trucks() -> Vec<MovementRecord> {
        vec![
            rec("CA1234AB", 1, Home, Greece),
            rec("CA1234AB", 3, Greece, Home),
            rec("PB0001AA", 2, Home, Turkey),
            rec("PB0001AA", 4, Turkey, Home),
            rec("EH5555EE", 2, Home, Home),
        ]
    }

    // ── analyze_records ───────────────────────────────────────────────────────

    #[test]
    fn test_no_mapping_gives_vehicle_view() {
        let (view, stats) = analyze_records(batch(two_trucks()), None);
        let ReportView::ByVehicle(blocks) = view else {
            panic!("expected the vehicle view");
        };
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks["CA1234AB"].len(), 1);
        assert!(blocks["EH5555EE"].is_empty());
        assert!(!stats.has_mapping);
        assert_eq!(stats.total_vehicles, 3);
        assert_eq!(stats.vehicles_with_travel, 2);
        assert_eq!(stats.total_blocks, 2);
        assert_eq!(stats.abroad_records, 2);
        assert!((stats.abroad_percentage - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_mapping_gives_driver_view() {
        let mapping: DriverMapping = [("CA1234AB", "Иван"), ("PB0001AA", "Иван")]
            .into_iter()
            .collect();
        let (view, stats) = analyze_records(batch(two_trucks()), Some(&mapping));
        let ReportView::ByDriver(grouping) = view else {
            panic!("expected the driver view");
        };
        let ivan = &grouping.groups[&DriverGroup::Driver("Иван".to_string())];
        assert_eq!(ivan.len(), 2);
        assert_eq!(ivan[0].vehicle_id, "CA1234AB");
        assert_eq!(ivan[1].vehicle_id, "PB0001AA");
        assert_eq!(stats.total_drivers, Some(1));
        assert_eq!(stats.unmapped_vehicles, Some(Vec::new()));
    }

    #[test]
    fn test_empty_mapping_still_gives_driver_view() {
        let (view, stats) = analyze_records(batch(two_trucks()), Some(&DriverMapping::new()));
        let ReportView::ByDriver(grouping) = view else {
            panic!("expected the driver view");
        };
        assert_eq!(grouping.unassigned().len(), 2);
        assert_eq!(
            stats.unmapped_vehicles,
            Some(vec!["CA1234AB".to_string(), "PB0001AA".to_string()])
        );
    }

    #[test]
    fn test_zero_records() {
        let (view, stats) = analyze_records(NormalizedBatch::default(), None);
        assert_eq!(view, ReportView::ByVehicle(BTreeMap::new()));
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.abroad_percentage, 0.0);
        assert_eq!(stats.total_blocks, 0);
    }

    #[test]
    fn test_skipped_rows_are_reported() {
        let (_, stats) = analyze_records(
            NormalizedBatch {
                records: two_trucks(),
                skipped_rows: 7,
            },
            None,
        );
        assert_eq!(stats.skipped_rows, 7);
    }

    // ── analyze ───────────────────────────────────────────────────────────────

    fn write_gps1(path: &Path, rows: &[[&str; 5]]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (i, cells) in rows.iter().enumerate() {
            for (c, value) in cells.iter().enumerate() {
                sheet.write_string(8 + i as u32, c as u16, *value).unwrap();
            }
        }
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_analyze_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let gps1 = tmp.path().join("gps1.xlsx");
        write_gps1(
            &gps1,
            &[
                [
                    "CA1234AB",
                    "2024-01-10 08:00:00",
                    "2024-01-10 14:00:00",
                    "Кулата, България",
                    "Δήμος Σερρών",
                ],
                [
                    "CA1234AB",
                    "2024-01-10 14:00:00",
                    "2024-01-11 09:00:00",
                    "Δήμος Σερρών",
                    "Δήμος Θεσσαλονίκης",
                ],
                [
                    "CA1234AB",
                    "2024-01-12 07:00:00",
                    "2024-01-12 20:00:00",
                    "Δήμος Σιντικής",
                    "Кулата, България",
                ],
            ],
        );
        let mapping = tmp.path().join("mapping.csv");
        std::fs::write(&mapping, "Камион;Шофьор\nCA1234AB;Иван Иванов\n").unwrap();

        let result = analyze(AnalysisInput {
            gps1: &gps1,
            gps2: None,
            mapping: Some(&mapping),
        })
        .unwrap();

        let ReportView::ByDriver(grouping) = &result.view else {
            panic!("expected the driver view");
        };
        let entries = &grouping.groups[&DriverGroup::Driver("Иван Иванов".to_string())];
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].block.duration_days, 3);
        assert_eq!(entries[0].block.end_time, at(12, 7));
        assert_eq!(result.statistics.total_records, 3);
        assert!(!result.metadata.generated_at.is_empty());
    }

    #[test]
    fn test_analyze_unreadable_mapping_falls_back_to_vehicle_view() {
        let tmp = TempDir::new().unwrap();
        let gps1 = tmp.path().join("gps1.xlsx");
        write_gps1(
            &gps1,
            &[["CA1234AB", "2024-01-10 08:00:00", "2024-01-10 14:00:00", "България", "Turkey"]],
        );

        let result = analyze(AnalysisInput {
            gps1: &gps1,
            gps2: None,
            mapping: Some(&tmp.path().join("missing.csv")),
        })
        .unwrap();

        assert!(matches!(result.view, ReportView::ByVehicle(_)));
        assert!(!result.statistics.has_mapping);
        assert_eq!(result.statistics.total_blocks, 1);
    }

    #[test]
    fn test_analyze_missing_gps1_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = analyze(AnalysisInput {
            gps1: &tmp.path().join("gps1.xlsx"),
            gps2: None,
            mapping: None,
        })
        .unwrap_err();
        assert!(matches!(err, PerDiemError::MissingInput(_)));
    }
}
