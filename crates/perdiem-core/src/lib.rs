//! Shared types for the per-diem calculator.
//!
//! Holds the canonical movement and travel-block records, the country
//! classifier, the daily rate table, error types, CLI settings and the
//! formatting helpers used by the report layer.

pub mod country;
pub mod error;
pub mod formatting;
pub mod models;
pub mod rates;
pub mod settings;
pub mod timestamps;

pub use country::{classify, CountryClass};
pub use error::{PerDiemError, Result};
