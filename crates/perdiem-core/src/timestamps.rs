use chrono::NaiveDateTime;

use crate::error::{PerDiemError, Result};

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// String layouts written by GPS System 1.
pub const GPS1_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// String layouts written by GPS System 2 (day first, seconds optional).
pub const GPS2_FORMATS: &[&str] = &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];

/// Parses the textual timestamps found in GPS exports.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Parse `s` with the first matching layout in `formats`.
    ///
    /// ISO 8601 (`2024-01-10T08:00:00`, with or without fractional seconds)
    /// is accepted as a fallback since spreadsheet tools sometimes re-save
    /// date cells in that form.
    pub fn parse(s: &str, formats: &[&str]) -> Result<NaiveDateTime> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PerDiemError::TimestampParse(String::new()));
        }

        for fmt in formats {
            if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Ok(ts);
            }
        }

        const ISO_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];
        for fmt in ISO_FORMATS {
            if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Ok(ts);
            }
        }

        Err(PerDiemError::TimestampParse(trimmed.to_string()))
    }
}
