//! Truck → driver master data.
//!
//! The mapping is a small CSV exported from the office spreadsheet: a header
//! line followed by `truck;driver` rows. Either `;` or `,` may be used as
//! the delimiter; it is detected from the header line.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use perdiem_core::error::{PerDiemError, Result};
use tracing::{debug, warn};

/// Vehicle id → driver name, both trimmed, keys compared case-sensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverMapping {
    entries: BTreeMap<String, String>,
}

impl DriverMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one assignment. Blank keys or names are ignored.
    pub fn insert(&mut self, vehicle: &str, driver: &str) {
        let vehicle = vehicle.trim();
        let driver = driver.trim();
        if vehicle.is_empty() || driver.is_empty() {
            return;
        }
        self.entries.insert(vehicle.to_string(), driver.to_string());
    }

    /// Driver of `vehicle`, matched exactly after trimming whitespace.
    pub fn driver_for(&self, vehicle: &str) -> Option<&str> {
        self.entries.get(vehicle.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct driver names in the mapping.
    pub fn drivers(&self) -> BTreeSet<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    /// Parse CSV text. The first line is a header and is skipped.
    pub fn parse(content: &str) -> Self {
        let content = content.trim_start_matches('\u{feff}');
        let mut lines = content.lines();
        let Some(header) = lines.next() else {
            return Self::default();
        };
        let delimiter = if header.contains(';') { ';' } else { ',' };

        let mut mapping = Self::default();
        for line in lines {
            let mut parts = line.split(delimiter);
            if let (Some(vehicle), Some(driver)) = (parts.next(), parts.next()) {
                mapping.insert(vehicle, driver);
            }
        }
        mapping
    }

    /// Read and parse a mapping file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PerDiemError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mapping = Self::parse(&content);
        if mapping.is_empty() {
            warn!("Mapping file {} has no truck/driver rows", path.display());
        }
        debug!(
            "Loaded {} truck assignments for {} drivers from {}",
            mapping.len(),
            mapping.drivers().len(),
            path.display()
        );
        Ok(mapping)
    }
}

impl<V: AsRef<str>, D: AsRef<str>> FromIterator<(V, D)> for DriverMapping {
    fn from_iter<I: IntoIterator<Item = (V, D)>>(iter: I) -> Self {
        let mut mapping = Self::default();
        for (vehicle, driver) in iter {
            mapping.insert(vehicle.as_ref(), driver.as_ref());
        }
        mapping
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_semicolon() {
        let mapping =
            DriverMapping::parse("Камион;Шофьор\nCA1234AB;Иван Иванов\nPB0001AA;Петър Петров\n");
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.driver_for("CA1234AB"), Some("Иван Иванов"));
        assert_eq!(mapping.driver_for("PB0001AA"), Some("Петър Петров"));
    }

    #[test]
    fn test_parse_comma_and_crlf() {
        let mapping = DriverMapping::parse("truck,driver\r\nCA1234AB , Иван Иванов \r\n");
        assert_eq!(mapping.driver_for("CA1234AB"), Some("Иван Иванов"));
    }

    #[test]
    fn test_parse_skips_header_only() {
        let mapping = DriverMapping::parse("Камион;Шофьор\n");
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_parse_empty_content() {
        assert!(DriverMapping::parse("").is_empty());
    }

    #[test]
    fn test_parse_ignores_short_and_blank_rows() {
        let content = "Камион;Шофьор\nCA1234AB\n;Никой\nPB0001AA;\n\nCB7777CC;Георги\n";
        let mapping = DriverMapping::parse(content);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.driver_for("CB7777CC"), Some("Георги"));
    }

    #[test]
    fn test_parse_extra_columns_and_bom() {
        let mapping =
            DriverMapping::parse("\u{feff}Камион;Шофьор;Бележка\nCA1234AB;Иван;резерва\n");
        assert_eq!(mapping.driver_for("CA1234AB"), Some("Иван"));
    }

    #[test]
    fn test_later_rows_override_earlier() {
        let mapping = DriverMapping::parse("Камион;Шофьор\nCA1234AB;Иван\nCA1234AB;Стефан\n");
        assert_eq!(mapping.driver_for("CA1234AB"), Some("Стефан"));
    }

    #[test]
    fn test_lookup_trims_but_is_case_sensitive() {
        let mapping: DriverMapping = [("CA1234AB", "Иван")].into_iter().collect();
        assert_eq!(mapping.driver_for("  CA1234AB "), Some("Иван"));
        assert_eq!(mapping.driver_for("ca1234ab"), None);
    }

    #[test]
    fn test_drivers_are_distinct() {
        let mapping: DriverMapping = [("A1", "Иван"), ("A2", "Иван"), ("A3", "Петър")]
            .into_iter()
            .collect();
        assert_eq!(mapping.drivers().len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mapping.csv");
        std::fs::write(&path, "Камион;Шофьор\nCA1234AB;Иван Иванов\n").unwrap();

        let mapping = DriverMapping::load(&path).unwrap();
        assert_eq!(mapping.driver_for("CA1234AB"), Some("Иван Иванов"));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = DriverMapping::load(&tmp.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, PerDiemError::FileRead { .. }));
    }
}
