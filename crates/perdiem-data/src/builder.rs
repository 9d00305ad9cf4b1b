//! Travel-block builder.
//!
//! Folds one vehicle's movement records into [`TravelBlock`]s: contiguous
//! stretches of time the truck spent outside the home country. Each record is
//! classified by its origin/destination pair into a [`Transition`] and fed
//! through a two-state machine ([`BuilderState`]); a block still open when the
//! records run out is sealed as-is.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use perdiem_core::country::CountryClass;
use perdiem_core::models::{calendar_days, MovementRecord, TravelBlock};
use tracing::{debug, warn};

// ── Transition ────────────────────────────────────────────────────────────────

/// Effect of a single record on the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Home → Home: no effect.
    Ignore,
    /// Home → abroad: departure.
    Start,
    /// Abroad → abroad: the trip goes on.
    Continue,
    /// Abroad → Home: return crossing.
    End,
}

impl Transition {
    pub fn of(record: &MovementRecord) -> Self {
        match (
            record.origin_country.is_home(),
            record.destination_country.is_home(),
        ) {
            (true, true) => Transition::Ignore,
            (true, false) => Transition::Start,
            (false, false) => Transition::Continue,
            (false, true) => Transition::End,
        }
    }
}

// ── OpenBlock ─────────────────────────────────────────────────────────────────

/// Accumulator for the block currently being built. Never empty.
#[derive(Debug, Clone)]
pub struct OpenBlock {
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    destination: CountryClass,
    countries_visited: Vec<CountryClass>,
    records: Vec<MovementRecord>,
}

impl OpenBlock {
    fn open(record: MovementRecord) -> Self {
        let mut block = Self {
            start_time: record.start_time,
            end_time: record.end_time,
            destination: record.destination_country,
            countries_visited: Vec::new(),
            records: Vec::new(),
        };
        block.visit(record.destination_country);
        block.records.push(record);
        block
    }

    fn visit(&mut self, country: CountryClass) {
        if !country.is_home() && !self.countries_visited.contains(&country) {
            self.countries_visited.push(country);
        }
    }

    fn extend(&mut self, record: MovementRecord) {
        self.end_time = record.end_time;
        self.destination = record.destination_country;
        self.visit(record.destination_country);
        self.records.push(record);
    }

    /// Close on a return crossing. The block ends when the crossing starts.
    fn close_with_return(mut self, record: MovementRecord) -> TravelBlock {
        self.end_time = record.start_time;
        self.records.push(record);
        self.seal()
    }

    fn seal(self) -> TravelBlock {
        let vehicle_id = self
            .records
            .first()
            .map(|r| r.vehicle_id.clone())
            .unwrap_or_default();
        TravelBlock {
            vehicle_id,
            start_time: self.start_time,
            end_time: self.end_time,
            destination: self.destination,
            countries_visited: self.countries_visited,
            duration_days: calendar_days(self.start_time, self.end_time),
            records: self.records,
        }
    }

    #[cfg(test)]
    fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    #[cfg(test)]
    fn end_time(&self) -> NaiveDateTime {
        self.end_time
    }
}

// ── BuilderState ──────────────────────────────────────────────────────────────

/// What a single step produced besides the next state.
#[derive(Debug, Clone, PartialEq)]
pub enum Emitted {
    Nothing,
    Sealed(TravelBlock),
    /// A return crossing arrived while no block was open.
    OrphanedReturn,
}

/// State of one vehicle's record stream.
#[derive(Debug, Clone, Default)]
pub enum BuilderState {
    #[default]
    Idle,
    Open(OpenBlock),
}

impl BuilderState {
    /// Apply one record and return the next state.
    pub fn step(self, record: MovementRecord) -> (BuilderState, Emitted) {
        match (Transition::of(&record), self) {
            (Transition::Ignore, state) => (state, Emitted::Nothing),

            (Transition::Start, BuilderState::Idle) => {
                (BuilderState::Open(OpenBlock::open(record)), Emitted::Nothing)
            }
            (Transition::Start, BuilderState::Open(stale)) => {
                debug!(
                    "Vehicle {}: departure at {} while a block was open, sealing it",
                    record.vehicle_id, record.start_time
                );
                (
                    BuilderState::Open(OpenBlock::open(record)),
                    Emitted::Sealed(stale.seal()),
                )
            }

            // Stream begins mid-trip: treat the first foreign leg as departure.
            (Transition::Continue, BuilderState::Idle) => {
                (BuilderState::Open(OpenBlock::open(record)), Emitted::Nothing)
            }
            (Transition::Continue, BuilderState::Open(mut block)) => {
                block.extend(record);
                (BuilderState::Open(block), Emitted::Nothing)
            }

            (Transition::End, BuilderState::Open(block)) => (
                BuilderState::Idle,
                Emitted::Sealed(block.close_with_return(record)),
            ),
            (Transition::End, BuilderState::Idle) => {
                warn!(
                    "Vehicle {}: return crossing at {} without a recorded departure",
                    record.vehicle_id, record.start_time
                );
                (BuilderState::Idle, Emitted::OrphanedReturn)
            }
        }
    }

    /// End of stream: a still-open block is reported, not dropped.
    pub fn finish(self) -> Option<TravelBlock> {
        match self {
            BuilderState::Idle => None,
            BuilderState::Open(block) => Some(block.seal()),
        }
    }
}

// ── VehicleBlocks ─────────────────────────────────────────────────────────────

/// Blocks built for one vehicle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleBlocks {
    pub blocks: Vec<TravelBlock>,
    /// Return crossings that had no matching departure.
    pub orphaned_returns: usize,
}

// ── TravelBlockBuilder ────────────────────────────────────────────────────────

/// Stateless entry point for block construction.
pub struct TravelBlockBuilder;

impl TravelBlockBuilder {
    /// Build the blocks of a single vehicle.
    ///
    /// Records may arrive in any order; they are stably sorted by start time
    /// before the fold, so ties keep their input order.
    pub fn build(mut records: Vec<MovementRecord>) -> VehicleBlocks {
        records.sort_by_key(|r| r.start_time);

        let (state, mut out) = records.into_iter().fold(
            (BuilderState::Idle, VehicleBlocks::default()),
            |(state, mut out), record| {
                let (next, emitted) = state.step(record);
                match emitted {
                    Emitted::Nothing => {}
                    Emitted::Sealed(block) => out.blocks.push(block),
                    Emitted::OrphanedReturn => out.orphaned_returns += 1,
                }
                (next, out)
            },
        );

        if let Some(trailing) = state.finish() {
            out.blocks.push(trailing);
        }
        out
    }

    /// Split `records` by vehicle and build each vehicle's blocks.
    ///
    /// Every vehicle that has at least one record gets an entry, even when it
    /// never left the country.
    pub fn build_all(records: Vec<MovementRecord>) -> BTreeMap<String, VehicleBlocks> {
        let mut by_vehicle: BTreeMap<String, Vec<MovementRecord>> = BTreeMap::new();
        for record in records {
            by_vehicle
                .entry(record.vehicle_id.clone())
                .or_default()
                .push(record);
        }

        let result: BTreeMap<String, VehicleBlocks> = by_vehicle
            .into_iter()
            .map(|(vehicle, records)| (vehicle, Self::build(records)))
            .collect();

        debug!(
            "TravelBlockBuilder: {} blocks for {} vehicles",
            result.values().map(|v| v.blocks.len()).sum::<usize>(),
            result.len()
        );
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
