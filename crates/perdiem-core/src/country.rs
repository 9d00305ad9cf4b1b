//! Country classification of free-text GPS addresses.
//!
//! The GPS systems only report a reverse-geocoded address string per stop.
//! [`classify`] maps such an address onto the closed [`CountryClass`] set by
//! looking for locale markers: the Bulgarian country name, Greek
//! administrative-division words, and country names in Cyrillic and Latin
//! script. The rule set is heuristic and non-exhaustive; anything foreign that
//! matches no rule lands in [`CountryClass::UnclassifiedAbroad`].

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Country bucket of one end of a movement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountryClass {
    /// Bulgaria, the baseline country for per-diem purposes.
    Home,
    Greece,
    Romania,
    Turkey,
    /// Abroad, but not one of the named countries.
    UnclassifiedAbroad,
    /// The address was empty. Treated as abroad by the block builder.
    Unknown,
}

impl CountryClass {
    /// Every class, in declaration order.
    pub const ALL: [CountryClass; 6] = [
        CountryClass::Home,
        CountryClass::Greece,
        CountryClass::Romania,
        CountryClass::Turkey,
        CountryClass::UnclassifiedAbroad,
        CountryClass::Unknown,
    ];

    /// `true` only for [`CountryClass::Home`].
    pub fn is_home(self) -> bool {
        self == CountryClass::Home
    }

    /// Label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            CountryClass::Home => "България",
            CountryClass::Greece => "Гърция",
            CountryClass::Romania => "Румъния",
            CountryClass::Turkey => "Турция",
            CountryClass::UnclassifiedAbroad => "Чужбина (неопределена)",
            CountryClass::Unknown => "Неизвестна",
        }
    }
}

impl fmt::Display for CountryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const HOME_MARKER: &str = "България";

const GREEK_MARKERS: &[&str] = &["Δήμος", "Περιφερ", "Ελληνικ", "Δημοτικ", "Κοινότητα"];

fn romania_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Румъния|(?i:rom[aâ]nia)").expect("regex is valid"))
}

fn turkey_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Турция|(?i:t[uü]rkiye|turkey)").expect("regex is valid"))
}

/// Classify a free-text address.
///
/// Rules are checked in order: empty → `Unknown`, Bulgarian name → `Home`,
/// Greek markers → `Greece`, Romania, Turkey, otherwise `UnclassifiedAbroad`.
/// An address mentioning both Bulgaria and another country is `Home`.
///
/// # Examples
///
/// ```
/// use perdiem_core::country::{classify, CountryClass};
///
/// assert_eq!(classify("ул. Шипка 3, Кърджали, България"), CountryClass::Home);
/// assert_eq!(classify("Δήμος Ξάνθης, Ξάνθη"), CountryClass::Greece);
/// assert_eq!(classify("Constanța, România"), CountryClass::Romania);
/// assert_eq!(classify(""), CountryClass::Unknown);
/// ```
pub fn classify(address: &str) -> CountryClass {
    let addr = address.trim();
    if addr.is_empty() {
        return CountryClass::Unknown;
    }
    if addr.contains(HOME_MARKER) {
        return CountryClass::Home;
    }
    if GREEK_MARKERS.iter().any(|m| addr.contains(m)) {
        return CountryClass::Greece;
    }
    if romania_pattern().is_match(addr) {
        return CountryClass::Romania;
    }
    if turkey_pattern().is_match(addr) {
        return CountryClass::Turkey;
    }
    CountryClass::UnclassifiedAbroad
}

// ── Tests ─────────────────────────────────────────────────────────────────────
