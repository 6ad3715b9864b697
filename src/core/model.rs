// RawSleuth - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers;
// the entity graph itself lives in core::graph.

use crate::util::constants;
use serde::{Deserialize, Serialize};

// =============================================================================
// Instrument model
// =============================================================================

/// Closed set of supported instrument models.
///
/// The model decides which line dialect is used to read the tool output
/// (see `core::dialect`). Anything the metadata tool reports that is not in
/// this list becomes `Unknown`, which still extracts, just without headers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum InstrumentModel {
    LtqOrbitrap,
    OrbitrapXl,
    LtqVelos,
    OrbitrapVelos,
    TsqVantage,
    QExactive,
    OrbitrapFusion,
    #[default]
    Unknown,
}

impl InstrumentModel {
    /// Returns all known variants (excluding `Unknown`).
    pub fn all() -> &'static [InstrumentModel] {
        &[
            InstrumentModel::LtqOrbitrap,
            InstrumentModel::OrbitrapXl,
            InstrumentModel::LtqVelos,
            InstrumentModel::OrbitrapVelos,
            InstrumentModel::TsqVantage,
            InstrumentModel::QExactive,
            InstrumentModel::OrbitrapFusion,
        ]
    }

    /// Model name as printed by the metadata tool.
    pub fn label(&self) -> &'static str {
        match self {
            InstrumentModel::LtqOrbitrap => "LTQ Orbitrap",
            InstrumentModel::OrbitrapXl => "LTQ Orbitrap XL",
            InstrumentModel::LtqVelos => "LTQ Velos",
            InstrumentModel::OrbitrapVelos => "LTQ Orbitrap Velos",
            InstrumentModel::TsqVantage => "TSQ Vantage",
            InstrumentModel::QExactive => "Q Exactive",
            InstrumentModel::OrbitrapFusion => "Orbitrap Fusion",
            InstrumentModel::Unknown => "Unknown",
        }
    }

    /// PSI-MS accession of the model term.
    pub fn accession(&self) -> Option<&'static str> {
        match self {
            InstrumentModel::LtqOrbitrap => Some("MS:1000449"),
            InstrumentModel::OrbitrapXl => Some("MS:1000556"),
            InstrumentModel::LtqVelos => Some("MS:1000855"),
            InstrumentModel::OrbitrapVelos => Some("MS:1001742"),
            InstrumentModel::TsqVantage => Some("MS:1001510"),
            InstrumentModel::QExactive => Some("MS:1001911"),
            InstrumentModel::OrbitrapFusion => Some("MS:1002416"),
            InstrumentModel::Unknown => None,
        }
    }

    /// Match a model tag against the known names and accessions.
    ///
    /// Matching is exact after trimming, case-insensitive. No match yields
    /// `Unknown`; this is a degradation, not an error.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        Self::all()
            .iter()
            .copied()
            .find(|model| {
                model.label().eq_ignore_ascii_case(tag)
                    || model
                        .accession()
                        .is_some_and(|acc| acc.eq_ignore_ascii_case(tag))
            })
            .unwrap_or(InstrumentModel::Unknown)
    }
}

impl std::fmt::Display for InstrumentModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Passes
// =============================================================================

/// The two independent observation categories extracted from a raw file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassKind {
    StatusLog,
    TuneMethod,
}

impl PassKind {
    /// Property type tag recorded on every Property built from this pass.
    pub fn type_tag(&self) -> &'static str {
        match self {
            PassKind::StatusLog => constants::STATUS_LOG_TYPE,
            PassKind::TuneMethod => constants::TUNE_METHOD_TYPE,
        }
    }

    /// File name of the external tool producing this pass.
    pub fn tool(&self) -> &'static str {
        match self {
            PassKind::StatusLog => constants::STATUS_LOG_TOOL,
            PassKind::TuneMethod => constants::TUNE_METHOD_TOOL,
        }
    }
}

impl std::fmt::Display for PassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_tag())
    }
}

// =============================================================================
// Line classification
// =============================================================================

/// Classification of one tool output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Blank line or end-of-section sentinel; resets the active section.
    Separator,
    /// Section header; scopes the observation names that follow.
    Header,
    /// Name/value observation.
    Observation,
}

// =============================================================================
// Controlled vocabulary
// =============================================================================

/// Reference to a controlled vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cv {
    pub label: String,
    pub name: String,
    pub uri: String,
    pub version: String,
}

impl Cv {
    pub fn new(label: &str, name: &str, uri: &str, version: &str) -> Self {
        Self {
            label: label.to_string(),
            name: name.to_string(),
            uri: uri.to_string(),
            version: version.to_string(),
        }
    }

    /// Vocabulary of instrument property terms.
    pub fn imon() -> Self {
        Self::new(
            constants::CV_IMON_LABEL,
            constants::CV_IMON_NAME,
            constants::CV_IMON_URI,
            constants::CV_IMON_VERSION,
        )
    }

    /// PSI-MS vocabulary (instrument models).
    pub fn psi_ms() -> Self {
        Self::new(
            constants::CV_MS_LABEL,
            constants::CV_MS_NAME,
            constants::CV_MS_URI,
            constants::CV_MS_VERSION,
        )
    }
}

// =============================================================================
// Aggregate
// =============================================================================

/// Descriptive statistics over the numeric observations of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation.
    pub sd: f64,
    /// First quartile (25th percentile).
    pub q1: f64,
    /// Third quartile (75th percentile).
    pub q3: f64,
}

/// Summary of every observation recorded for one `(section, name)` entry.
///
/// Produced by `core::stats::aggregate`; immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// First observation, possibly empty.
    pub first_value: String,

    /// Number of non-empty observations.
    pub count: usize,

    /// Number of distinct observation strings, the empty string included.
    pub distinct_count: usize,

    /// Present iff every non-empty observation is a number.
    pub summary: Option<NumericSummary>,
}

impl Aggregate {
    pub fn is_numeric(&self) -> bool {
        self.summary.is_some()
    }
}
