//! Daily allowance rates and the EUR→BGN conversion constant.
//!
//! The table is plain data so callers can load it from a JSON file, tweak it
//! in tests, or fall back to [`RateTable::default`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::country::CountryClass;
use crate::error::{PerDiemError, Result};
use crate::models::TravelBlock;

/// Fixed EUR→BGN rate of the currency board.
pub const EUR_TO_BGN: f64 = 1.95583;

/// Rate applied to any country without an explicit entry.
pub const DEFAULT_EUR_RATE: f64 = 43.0;

/// Which country of a multi-country block decides the daily rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePolicy {
    /// Rate of the block's final destination.
    #[default]
    LastCountry,
    /// Highest rate among all countries visited during the block.
    HighestRate,
}

/// Daily per-diem rates in EUR keyed by country class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    /// EUR per day for each explicitly priced country.
    #[serde(default = "default_rates")]
    pub rates: BTreeMap<CountryClass, f64>,
    /// EUR per day for countries missing from `rates`.
    #[serde(default = "default_rate")]
    pub default_rate: f64,
    /// Multiplier turning EUR amounts into BGN.
    #[serde(default = "default_conversion")]
    pub conversion_rate: f64,
    #[serde(default)]
    pub policy: RatePolicy,
}

fn default_rates() -> BTreeMap<CountryClass, f64> {
    BTreeMap::from([
        (CountryClass::Greece, 43.0),
        (CountryClass::Romania, 46.0),
        (CountryClass::Turkey, 43.0),
        (CountryClass::UnclassifiedAbroad, 43.0),
    ])
}

fn default_rate() -> f64 {
    DEFAULT_EUR_RATE
}

fn default_conversion() -> f64 {
    EUR_TO_BGN
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            rates: default_rates(),
            default_rate: DEFAULT_EUR_RATE,
            conversion_rate: EUR_TO_BGN,
            policy: RatePolicy::LastCountry,
        }
    }
}

impl RateTable {
    /// EUR per day for a single country.
    pub fn rate_for_country(&self, country: CountryClass) -> f64 {
        self.rates.get(&country).copied().unwrap_or(self.default_rate)
    }

    /// EUR per day for a whole block, resolved with the table's [`RatePolicy`].
    pub fn rate_for(&self, block: &TravelBlock) -> f64 {
        match self.policy {
            RatePolicy::LastCountry => self.rate_for_country(block.destination),
            RatePolicy::HighestRate => block
                .countries_visited
                .iter()
                .map(|c| self.rate_for_country(*c))
                .fold(self.rate_for_country(block.destination), f64::max),
        }
    }

    /// Allowance owed for `block` in EUR.
    pub fn amount_eur(&self, block: &TravelBlock) -> f64 {
        f64::from(block.duration_days) * self.rate_for(block)
    }

    /// Convert a EUR amount to BGN.
    pub fn to_bgn(&self, eur: f64) -> f64 {
        eur * self.conversion_rate
    }

    /// Reject negative or non-finite values.
    pub fn validate(&self) -> Result<()> {
        for (country, rate) in &self.rates {
            if !rate.is_finite() || *rate < 0.0 {
                return Err(PerDiemError::Config(format!(
                    "invalid rate {rate} for {country:?}"
                )));
            }
        }
        if !self.default_rate.is_finite() || self.default_rate < 0.0 {
            return Err(PerDiemError::Config(format!(
                "invalid default rate {}",
                self.default_rate
            )));
        }
        if !self.conversion_rate.is_finite() || self.conversion_rate <= 0.0 {
            return Err(PerDiemError::Config(format!(
                "invalid conversion rate {}",
                self.conversion_rate
            )));
        }
        Ok(())
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// Default location of the rate file: `~/.perdiem/rates.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Rate file path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".perdiem").join("rates.json")
    }

    /// Load rates from `path`.
    ///
    /// A missing file yields the built-in defaults; a present but malformed or
    /// invalid file is an error so that billing never silently uses the wrong
    /// figures.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No rate file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(PerDiemError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let table: RateTable = serde_json::from_str(&content)?;
        table.validate()?;
        debug!("Loaded rate table from {}", path.display());
        Ok(table)
    }

    /// Load from the explicit path when given, otherwise from the default
    /// location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                if !p.exists() {
                    warn!("Rate file {} does not exist", p.display());
                    return Err(PerDiemError::MissingInput(format!(
                        "rate file {}",
                        p.display()
                    )));
                }
                Self::load_from(p)
            }
            None => Self::load_from(&Self::config_path()),
        }
    }

    /// Atomically write the table to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
