//! Driver grouping and run statistics.
//!
//! Blocks are built per vehicle, but per-diem is owed to people. The
//! aggregator attributes every block to the driver of its vehicle, merges each
//! driver's blocks across all trucks they drove, and sorts them by departure.

use std::collections::BTreeMap;

use perdiem_core::error::{PerDiemError, Result};
use perdiem_core::formatting::percentage;
use perdiem_core::models::{DriverGroup, DriverTravelEntry, MovementRecord, TravelBlock};
use serde::Serialize;
use tracing::{debug, warn};

use crate::builder::VehicleBlocks;
use crate::mapping::DriverMapping;

// ── DriverGrouping ────────────────────────────────────────────────────────────

/// Blocks partitioned by driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverGrouping {
    /// Named drivers in name order, then [`DriverGroup::Unassigned`].
    pub groups: BTreeMap<DriverGroup, Vec<DriverTravelEntry>>,
    /// Vehicles with at least one block but no driver, sorted.
    pub unmapped_vehicles: Vec<String>,
}

impl DriverGrouping {
    /// Named drivers that have blocks; the unassigned bucket is not a driver.
    pub fn total_drivers(&self) -> usize {
        self.groups.keys().filter(|g| !g.is_unassigned()).count()
    }

    pub fn total_entries(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn unassigned(&self) -> &[DriverTravelEntry] {
        self.groups
            .get(&DriverGroup::Unassigned)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

// ── RunStatistics ─────────────────────────────────────────────────────────────

/// Whole-run counters reported next to the blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    pub total_records: usize,
    /// Records whose destination is not the home country.
    pub abroad_records: usize,
    /// `abroad_records / total_records` in percent, one decimal; 0 when empty.
    pub abroad_percentage: f64,
    pub total_vehicles: usize,
    /// Vehicles with at least one block.
    pub vehicles_with_travel: usize,
    pub total_blocks: usize,
    /// Source rows dropped because a timestamp could not be parsed.
    pub skipped_rows: usize,
    /// Return crossings with no departure in view.
    pub orphaned_returns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_drivers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmapped_vehicles: Option<Vec<String>>,
    pub has_mapping: bool,
}

impl RunStatistics {
    /// Record counters; block counters stay zero until
    /// [`RunStatistics::with_blocks`].
    pub fn from_records(records: &[MovementRecord], skipped_rows: usize) -> Self {
        let abroad_records = records.iter().filter(|r| r.ends_abroad()).count();
        Self {
            total_records: records.len(),
            abroad_records,
            abroad_percentage: percentage(abroad_records as f64, records.len() as f64, 1),
            skipped_rows,
            ..Self::default()
        }
    }

    /// Add the counters derived from the per-vehicle blocks.
    pub fn with_blocks(mut self, blocks: &BTreeMap<String, VehicleBlocks>) -> Self {
        self.total_vehicles = blocks.len();
        self.vehicles_with_travel = blocks.values().filter(|v| !v.blocks.is_empty()).count();
        self.total_blocks = blocks.values().map(|v| v.blocks.len()).sum();
        self.orphaned_returns = blocks.values().map(|v| v.orphaned_returns).sum();
        self
    }

    /// Add the driver-view counters.
    pub fn with_grouping(mut self, grouping: &DriverGrouping) -> Self {
        self.total_drivers = Some(grouping.total_drivers());
        self.unmapped_vehicles = Some(grouping.unmapped_vehicles.clone());
        self.has_mapping = true;
        self
    }
}

// ── DriverAggregator ──────────────────────────────────────────────────────────

/// Stateless helper that turns per-vehicle blocks into per-driver lists.
pub struct DriverAggregator;

impl DriverAggregator {
    /// Attribute every block to its vehicle's driver.
    ///
    /// Blocks of vehicles missing from `mapping` go to
    /// [`DriverGroup::Unassigned`] rather than being dropped, so the result is
    /// a partition of the input blocks. Within a group, entries are ordered by
    /// block start time only; trucks interleave.
    pub fn group_by_driver(
        blocks: BTreeMap<String, Vec<TravelBlock>>,
        mapping: &DriverMapping,
    ) -> DriverGrouping {
        let mut grouping = DriverGrouping::default();

        for (vehicle, vehicle_blocks) in blocks {
            if vehicle_blocks.is_empty() {
                continue;
            }

            let driver = match mapping.driver_for(&vehicle) {
                Some(name) => DriverGroup::Driver(name.to_string()),
                None => {
                    grouping.unmapped_vehicles.push(vehicle.clone());
                    DriverGroup::Unassigned
                }
            };

            let entries = grouping.groups.entry(driver.clone()).or_default();
            entries.extend(vehicle_blocks.into_iter().map(|block| DriverTravelEntry {
                driver: driver.clone(),
                vehicle_id: vehicle.clone(),
                block,
            }));
        }

        for entries in grouping.groups.values_mut() {
            entries.sort_by_key(|e| e.block.start_time);
        }

        if !grouping.unmapped_vehicles.is_empty() {
            warn!(
                "{} vehicle(s) with travel have no driver: {}",
                grouping.unmapped_vehicles.len(),
                grouping.unmapped_vehicles.join(", ")
            );
        }
        debug!(
            "DriverAggregator: {} entries across {} groups",
            grouping.total_entries(),
            grouping.groups.len()
        );

        grouping
    }

    /// Strip the per-vehicle builder output down to its blocks.
    pub fn into_block_map(
        built: BTreeMap<String, VehicleBlocks>,
    ) -> BTreeMap<String, Vec<TravelBlock>> {
        built.into_iter().map(|(v, b)| (v, b.blocks)).collect()
    }

    /// Blocks of one vehicle; asking for a vehicle the map never saw is a
    /// caller bug.
    pub fn blocks_of<'a>(
        blocks: &'a BTreeMap<String, Vec<TravelBlock>>,
        vehicle: &str,
    ) -> Result<&'a [TravelBlock]> {
        blocks
            .get(vehicle)
            .map(Vec::as_slice)
            .ok_or_else(|| PerDiemError::UnknownVehicle(vehicle.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
