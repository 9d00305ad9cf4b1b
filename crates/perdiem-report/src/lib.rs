//! Report layer of the per-diem calculator.
//!
//! Prices the travel blocks of an analysis run and renders them as a terminal
//! table, JSON, or a styled Excel workbook.

pub mod json;
pub mod rows;
pub mod table;
pub mod xlsx;

pub use rows::{build_report, Report, ReportRow, ReportSection, Totals};
