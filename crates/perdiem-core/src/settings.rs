use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

use crate::error::{PerDiemError, Result};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Per-diem calculator for GPS truck logs
#[derive(Parser, Debug, Clone)]
#[command(
    name = "perdiem",
    about = "Per-diem (командировъчни) calculator for GPS truck logs",
    version
)]
pub struct Settings {
    /// GPS System 1 export (.xlsx, single sheet)
    #[arg(long, env = "PERDIEM_GPS1")]
    pub gps1: Option<PathBuf>,

    /// GPS System 2 export (.xlsx, one sheet per truck)
    #[arg(long, env = "PERDIEM_GPS2")]
    pub gps2: Option<PathBuf>,

    /// Truck→driver mapping (CSV, `Камион;Шофьор`)
    #[arg(long, env = "PERDIEM_MAPPING")]
    pub mapping: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json", "xlsx"])]
    pub format: String,

    /// Output file for the xlsx format (defaults to Командировки_YYYY_MM.xlsx)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Rate table (JSON); defaults to ~/.perdiem/rates.json when present
    #[arg(long)]
    pub rates: Option<PathBuf>,

    /// Write the built-in rate table to --rates (or ~/.perdiem/rates.json) and exit
    #[arg(long)]
    pub init_rates: bool,

    /// Logging level
    #[arg(
        long,
        default_value = "WARNING",
        value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"]
    )]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply overrides.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    /// `--debug` overrides the log level.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The GPS1 path, which every run needs.
    pub fn require_gps1(&self) -> Result<&PathBuf> {
        self.gps1
            .as_ref()
            .ok_or_else(|| PerDiemError::MissingInput("GPS System 1 file (--gps1)".to_string()))
    }

    /// Where the xlsx report goes: `--output` or a month-stamped default.
    pub fn output_path(&self, today: NaiveDate) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_output_file(today)))
    }
}

/// Default report file name, e.g. `Командировки_2024_01.xlsx`.
pub fn default_output_file(today: NaiveDate) -> String {
    format!("Командировки_{}.xlsx", today.format("%Y_%m"))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Vec<String> {
        std::iter::once("perdiem")
            .chain(extra.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_from_args(args(&["--gps1", "a.xlsx"]));
        assert_eq!(settings.gps1, Some(PathBuf::from("a.xlsx")));
        assert_eq!(settings.gps2, None);
        assert_eq!(settings.mapping, None);
        assert_eq!(settings.format, "table");
        assert_eq!(settings.log_level, "WARNING");
        assert!(!settings.init_rates);
    }

    #[test]
    fn test_all_inputs() {
        let settings = Settings::load_from_args(args(&[
            "--gps1",
            "gps1.xlsx",
            "--gps2",
            "gps2.xlsx",
            "--mapping",
            "mapping.csv",
            "--format",
            "xlsx",
            "--output",
            "out.xlsx",
        ]));
        assert_eq!(settings.gps2, Some(PathBuf::from("gps2.xlsx")));
        assert_eq!(settings.mapping, Some(PathBuf::from("mapping.csv")));
        assert_eq!(settings.format, "xlsx");
        assert_eq!(settings.output, Some(PathBuf::from("out.xlsx")));
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let settings = Settings::load_from_args(args(&["--log-level", "ERROR", "--debug"]));
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_invalid_format_rejected() {
        let result = Settings::try_parse_from(args(&["--format", "pdf"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_require_gps1_missing() {
        let settings = Settings::load_from_args(args(&[]));
        let err = settings.require_gps1().unwrap_err();
        assert!(err.to_string().contains("--gps1"));
    }

    #[test]
    fn test_output_path_default_is_month_stamped() {
        let settings = Settings::load_from_args(args(&["--gps1", "a.xlsx"]));
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            settings.output_path(today),
            PathBuf::from("Командировки_2024_03.xlsx")
        );
    }

    #[test]
    fn test_output_path_explicit() {
        let settings = Settings::load_from_args(args(&["--output", "report.xlsx"]));
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(settings.output_path(today), PathBuf::from("report.xlsx"));
    }
}
