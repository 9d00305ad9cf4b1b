use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::country::{classify, CountryClass};

/// Which GPS tracking system a record was exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSystem {
    /// Single-sheet export, one row per trip segment for all trucks.
    Gps1,
    /// Multi-sheet export, one worksheet per truck.
    Gps2,
}

/// One logged trip segment of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    /// Registration number of the truck.
    pub vehicle_id: String,
    /// When the segment started (local time as exported).
    pub start_time: NaiveDateTime,
    /// When the segment ended.
    pub end_time: NaiveDateTime,
    /// Country bucket of the start address.
    pub origin_country: CountryClass,
    /// Country bucket of the end address.
    pub destination_country: CountryClass,
    /// Raw start address, if the export had one.
    #[serde(default)]
    pub origin_address: Option<String>,
    /// Raw end address, if the export had one.
    #[serde(default)]
    pub destination_address: Option<String>,
    pub source: SourceSystem,
}

impl MovementRecord {
    /// Build a record from already classified countries.
    pub fn new(
        vehicle_id: impl Into<String>,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        origin_country: CountryClass,
        destination_country: CountryClass,
        source: SourceSystem,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            start_time,
            end_time,
            origin_country,
            destination_country,
            origin_address: None,
            destination_address: None,
            source,
        }
    }

    /// Build a record from raw addresses, classifying both ends.
    pub fn from_addresses(
        vehicle_id: impl Into<String>,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        origin_address: Option<String>,
        destination_address: Option<String>,
        source: SourceSystem,
    ) -> Self {
        let origin_country = classify(origin_address.as_deref().unwrap_or_default());
        let destination_country = classify(destination_address.as_deref().unwrap_or_default());
        Self {
            vehicle_id: vehicle_id.into(),
            start_time,
            end_time,
            origin_country,
            destination_country,
            origin_address,
            destination_address,
            source,
        }
    }

    /// `true` when the record ends outside the home country.
    pub fn ends_abroad(&self) -> bool {
        !self.destination_country.is_home()
    }
}

/// One uninterrupted stay abroad of one vehicle, from departure to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelBlock {
    pub vehicle_id: String,
    /// Start of the outbound crossing.
    pub start_time: NaiveDateTime,
    /// Start of the return crossing, or the end of the last leg seen.
    pub end_time: NaiveDateTime,
    /// Destination of the last leg abroad.
    pub destination: CountryClass,
    /// Every non-home destination reached inside the block, first-seen order.
    pub countries_visited: Vec<CountryClass>,
    /// Constituent records, time ordered.
    pub records: Vec<MovementRecord>,
    /// Inclusive calendar-day count, never below 1.
    pub duration_days: u32,
}

impl TravelBlock {
    /// Number of movement records folded into the block.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Inclusive number of calendar days between two timestamps, at least 1.
///
/// Time of day is ignored, so a block from 23:50 to 00:10 spans two days and a
/// block whose end precedes its start still bills one day.
pub fn calendar_days(start: NaiveDateTime, end: NaiveDateTime) -> u32 {
    let days = (end.date() - start.date()).num_days() + 1;
    u32::try_from(days.max(1)).unwrap_or(u32::MAX)
}

/// Label of the group holding blocks of vehicles without a known driver.
pub const UNASSIGNED_LABEL: &str = "⚠️ Неразпределени";

/// Grouping key for the driver view.
///
/// Ordering puts named drivers first (by name) and the unassigned bucket last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverGroup {
    Driver(String),
    Unassigned,
}

impl DriverGroup {
    /// Human-readable group label.
    pub fn label(&self) -> &str {
        match self {
            DriverGroup::Driver(name) => name,
            DriverGroup::Unassigned => UNASSIGNED_LABEL,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, DriverGroup::Unassigned)
    }
}

/// A travel block attributed to a driver (or the unassigned bucket).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverTravelEntry {
    pub driver: DriverGroup,
    /// Vehicle the block was driven with.
    pub vehicle_id: String,
    pub block: TravelBlock,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
