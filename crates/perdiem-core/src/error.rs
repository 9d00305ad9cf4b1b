use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the per-diem calculator.
#[derive(Error, Debug)]
pub enum PerDiemError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A GPS workbook could not be opened or one of its sheets decoded.
    #[error("Failed to read workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    /// A required input file was not supplied or does not exist.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A timestamp string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// A vehicle id was looked up in a block map that does not contain it.
    #[error("Vehicle {0} has no entry in the block map")]
    UnknownVehicle(String),

    /// The report could not be written out.
    #[error("Export error: {0}")]
    Export(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the per-diem crates.
pub type Result<T> = std::result::Result<T, PerDiemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = PerDiemError::FileRead {
            path: PathBuf::from("/uploads/mapping.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/uploads/mapping.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_workbook() {
        let err = PerDiemError::Workbook {
            path: PathBuf::from("gps1.xlsx"),
            message: "invalid zip header".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to read workbook gps1.xlsx: invalid zip header"
        );
    }

    #[test]
    fn test_error_display_missing_input() {
        let err = PerDiemError::MissingInput("GPS1 workbook".to_string());
        assert_eq!(err.to_string(), "Missing input: GPS1 workbook");
    }

    #[test]
    fn test_error_display_timestamp_parse() {
        let err = PerDiemError::TimestampParse("31/02/2024 25:00".to_string());
        assert_eq!(err.to_string(), "Invalid timestamp format: 31/02/2024 25:00");
    }

    #[test]
    fn test_error_display_unknown_vehicle() {
        let err = PerDiemError::UnknownVehicle("CA1234AB".to_string());
        assert_eq!(err.to_string(), "Vehicle CA1234AB has no entry in the block map");
    }

    #[test]
    fn test_error_display_config() {
        let err = PerDiemError::Config("negative rate for greece".to_string());
        assert_eq!(err.to_string(), "Configuration error: negative rate for greece");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PerDiemError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: PerDiemError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
