//! Data layer of the per-diem calculator.
//!
//! Reads the GPS exports and the driver mapping, builds travel blocks per
//! vehicle, groups them by driver and runs the top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod builder;
pub mod mapping;
pub mod reader;

pub use perdiem_core as core;
