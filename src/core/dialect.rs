// RawSleuth - core/dialect.rs
//
// Per-model line dialects for the extraction tool output.
// Core layer: pure string logic, no I/O.
//
// Every instrument family prints its status log and tune method slightly
// differently. A `Dialect` answers three questions about one line: what kind
// of line is it, what section does a header line open, and which name/value
// pair does an observation line carry. `InstrumentModel::dialect()` picks the
// implementation; a new model gets a new variant and, if its output differs
// from the existing families, a new dialect.

use crate::core::model::{InstrumentModel, LineKind};
use crate::util::constants::{
    END_OF_SECTION_SENTINEL, FIELD_DELIMITER, NON_ASCII_REPLACEMENT, QEXACTIVE_HEADER_MARKER,
    SECTION_JOINER,
};

/// Model-specific reading rules for tool output lines.
pub trait Dialect: Send + Sync + std::fmt::Debug {
    /// Classify one line.
    ///
    /// Separators are model-independent. A line with more than one field is
    /// always an observation; single-field lines are decided by
    /// `is_header_field`.
    fn classify_line(&self, line: &str) -> LineKind {
        if is_separator(line) {
            return LineKind::Separator;
        }
        let fields = split_fields(line);
        if fields.len() > 1 {
            return LineKind::Observation;
        }
        let field = fields.first().copied().unwrap_or("");
        if self.is_header_field(field) {
            LineKind::Header
        } else {
            LineKind::Observation
        }
    }

    /// Whether a single-field line is a section header.
    fn is_header_field(&self, field: &str) -> bool;

    /// Section text opened by a header line, given the currently active one.
    fn extract_header(&self, line: &str, previous: &str) -> String;

    /// `(name, value)` carried by an observation line. A missing value is
    /// the empty string; this never fails.
    fn extract_name_value(&self, line: &str) -> (String, String);
}

impl InstrumentModel {
    /// The dialect used to read tool output for this model.
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            InstrumentModel::LtqOrbitrap
            | InstrumentModel::OrbitrapXl
            | InstrumentModel::LtqVelos
            | InstrumentModel::OrbitrapVelos => &OrbitrapDialect,
            InstrumentModel::TsqVantage => &TsqVantageDialect,
            InstrumentModel::QExactive => &QExactiveDialect,
            InstrumentModel::OrbitrapFusion => &OrbitrapFusionDialect,
            InstrumentModel::Unknown => &UnknownDialect,
        }
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Blank lines and end-of-section sentinels close the active section.
pub fn is_separator(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with(END_OF_SECTION_SENTINEL)
}

/// Split a line into tab-delimited fields, dropping trailing empty fields.
///
/// `"Temp\t"` is one field, so a header followed by a stray tab is still a
/// header.
pub fn split_fields(line: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

/// Replace every non-ASCII character with `?`.
pub fn to_ascii(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() { c } else { NON_ASCII_REPLACEMENT })
        .collect()
}

/// Second field, trimmed, or empty.
fn second_field(fields: &[&str]) -> String {
    fields
        .get(1)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// First field trimmed and cut at its last colon, if any.
fn name_before_last_colon(field: &str) -> &str {
    let field = field.trim();
    match field.rfind(':') {
        Some(idx) => field[..idx].trim_end(),
        None => field,
    }
}

// =============================================================================
// Orbitrap family (LTQ Orbitrap, Orbitrap XL, LTQ Velos, Orbitrap Velos)
// =============================================================================

/// Headers are plain text without a colon. Observations are
/// `Name:\tvalue` or `Name: value`, optionally preceded by index columns.
#[derive(Debug)]
pub struct OrbitrapDialect;

impl Dialect for OrbitrapDialect {
    fn is_header_field(&self, field: &str) -> bool {
        !field.contains(':')
    }

    fn extract_header(&self, line: &str, _previous: &str) -> String {
        to_ascii(line.trim())
    }

    fn extract_name_value(&self, line: &str) -> (String, String) {
        let fields = split_fields(line);

        let Some(idx) = fields.iter().position(|f| f.contains(':')) else {
            // No colon anywhere: best effort, first field is the name.
            let name = fields.first().map(|f| f.trim()).unwrap_or("");
            return (to_ascii(name), second_field(&fields));
        };

        let field = fields[idx].trim();
        let (name, inline) = if let Some(stripped) = field.strip_suffix(':') {
            (stripped, "")
        } else if let Some((name, value)) = field.split_once(": ") {
            (name, value)
        } else {
            // Contains a colon that is neither trailing nor followed by a
            // space, e.g. "Ratio:2"; the name ends at the last colon.
            let colon = field.rfind(':').unwrap_or(field.len());
            (&field[..colon], field.get(colon + 1..).unwrap_or(""))
        };

        let inline = inline.trim();
        let value = if inline.is_empty() {
            fields
                .get(idx + 1)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        } else {
            inline.to_string()
        };

        (to_ascii(name.trim()), value)
    }
}

// =============================================================================
// TSQ Vantage
// =============================================================================

/// Every single-field line is a header. A header starting with a quote
/// continues the previous header: `Scan Event` then `"1"` gives
/// `Scan Event - "1"`.
#[derive(Debug)]
pub struct TsqVantageDialect;

impl Dialect for TsqVantageDialect {
    fn is_header_field(&self, _field: &str) -> bool {
        true
    }

    fn extract_header(&self, line: &str, previous: &str) -> String {
        let candidate = line.trim();

        // Only the base part of the previous header is continued, so
        // consecutive quoted headers do not pile up.
        let base = match previous.find('-') {
            Some(idx) => previous[..idx].trim(),
            None => previous,
        };

        if candidate.starts_with('"') && !base.is_empty() {
            to_ascii(&format!("{base}{SECTION_JOINER}{candidate}"))
        } else {
            to_ascii(candidate)
        }
    }

    fn extract_name_value(&self, line: &str) -> (String, String) {
        let fields = split_fields(line);
        let name = fields.first().map(|f| f.trim()).unwrap_or("");
        (to_ascii(name), second_field(&fields))
    }
}

// =============================================================================
// Q Exactive
// =============================================================================

/// Headers look like `=== Ion Source: ===`.
#[derive(Debug)]
pub struct QExactiveDialect;

impl Dialect for QExactiveDialect {
    fn is_header_field(&self, field: &str) -> bool {
        field.contains(QEXACTIVE_HEADER_MARKER)
    }

    fn extract_header(&self, line: &str, _previous: &str) -> String {
        let line = line.trim();
        let start = line.find(' ');
        let colon = line.find(':');

        let text = match (start, colon) {
            (Some(s), Some(c)) if s < c => line[s..c].trim(),
            _ => {
                let head = match colon {
                    Some(c) => &line[..c],
                    None => line,
                };
                head.trim_matches(|c: char| c == '=' || c.is_whitespace())
            }
        };
        to_ascii(text)
    }

    fn extract_name_value(&self, line: &str) -> (String, String) {
        qexactive_fusion_name_value(line)
    }
}

// =============================================================================
// Orbitrap Fusion
// =============================================================================

/// Headers are plain text without a colon. A header candidate that still
/// carries a colon is a mis-classified observation and keeps the previous
/// header.
#[derive(Debug)]
pub struct OrbitrapFusionDialect;

impl Dialect for OrbitrapFusionDialect {
    fn is_header_field(&self, field: &str) -> bool {
        !field.contains(':')
    }

    fn extract_header(&self, line: &str, previous: &str) -> String {
        if line.contains(':') {
            previous.to_string()
        } else {
            to_ascii(line.trim())
        }
    }

    fn extract_name_value(&self, line: &str) -> (String, String) {
        qexactive_fusion_name_value(line)
    }
}

/// Q Exactive and Fusion share observation layout: `Name:\tvalue`.
fn qexactive_fusion_name_value(line: &str) -> (String, String) {
    let fields = split_fields(line);
    let name = fields
        .first()
        .map(|f| name_before_last_colon(f))
        .unwrap_or("");
    (to_ascii(name), second_field(&fields))
}

// =============================================================================
// Unknown
// =============================================================================

/// Fallback for unrecognised models: no headers, the whole line is the name.
#[derive(Debug)]
pub struct UnknownDialect;

impl Dialect for UnknownDialect {
    fn is_header_field(&self, _field: &str) -> bool {
        false
    }

    fn extract_header(&self, line: &str, _previous: &str) -> String {
        to_ascii(line.trim())
    }

    fn extract_name_value(&self, line: &str) -> (String, String) {
        (line.to_string(), String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: &str, value: &str) -> (String, String) {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn test_separators() {
        for model in InstrumentModel::all()
            .iter()
            .chain(std::iter::once(&InstrumentModel::Unknown))
        {
            let dialect = model.dialect();
            assert_eq!(dialect.classify_line(""), LineKind::Separator);
            assert_eq!(dialect.classify_line("   \t "), LineKind::Separator);
            assert_eq!(
                dialect.classify_line("--END_OF_STATUSLOG"),
                LineKind::Separator
            );
        }
    }

    #[test]
    fn test_split_fields_drops_trailing_empty() {
        assert_eq!(split_fields("Temp\t"), vec!["Temp"]);
        assert_eq!(split_fields("a\t\tb\t\t"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_orbitrap_classification() {
        let d = InstrumentModel::LtqOrbitrap.dialect();
        assert_eq!(d.classify_line("Foo"), LineKind::Header);
        assert_eq!(d.classify_line("Temp\t"), LineKind::Header);
        assert_eq!(d.classify_line("Foo: 12.3"), LineKind::Observation);
        assert_eq!(d.classify_line("Foo\tBar"), LineKind::Observation);
    }

    #[test]
    fn test_orbitrap_inline_value() {
        let d = InstrumentModel::LtqOrbitrap.dialect();
        assert_eq!(d.extract_name_value("Foo: 12.3"), pair("Foo", "12.3"));
    }

    #[test]
    fn test_orbitrap_tab_value() {
        let d = InstrumentModel::OrbitrapVelos.dialect();
        assert_eq!(
            d.extract_name_value("Source Voltage (kV):\t4.50"),
            pair("Source Voltage (kV)", "4.50")
        );
        assert_eq!(
            d.extract_name_value("Acquisition Time:\t10:30:00"),
            pair("Acquisition Time", "10:30:00")
        );
        assert_eq!(d.extract_name_value("Lonely:"), pair("Lonely", ""));
    }

    #[test]
    fn test_orbitrap_skips_index_column() {
        let d = InstrumentModel::LtqOrbitrap.dialect();
        assert_eq!(d.extract_name_value("20.0\tTemp: 21.5"), pair("Temp", "21.5"));
    }

    #[test]
    fn test_orbitrap_without_colon_degrades() {
        let d = InstrumentModel::LtqVelos.dialect();
        assert_eq!(d.extract_name_value("Name\tValue"), pair("Name", "Value"));
    }

    #[test]
    fn test_orbitrap_header_is_ascii() {
        let d = InstrumentModel::OrbitrapXl.dialect();
        assert_eq!(d.extract_header("  Temp °C  ", ""), "Temp ?C");
    }

    #[test]
    fn test_tsq_every_single_field_is_header() {
        let d = InstrumentModel::TsqVantage.dialect();
        assert_eq!(d.classify_line("Scan Event"), LineKind::Header);
        assert_eq!(d.classify_line("Has: colon"), LineKind::Header);
        assert_eq!(d.classify_line("Name\t1"), LineKind::Observation);
    }

    #[test]
    fn test_tsq_quoted_header_continues_previous() {
        let d = InstrumentModel::TsqVantage.dialect();
        assert_eq!(d.extract_header("\"1\"", "Scan Event"), "Scan Event - \"1\"");
        // Previous already merged: only its base is continued.
        assert_eq!(
            d.extract_header("\"2\"", "Scan Event - \"1\""),
            "Scan Event - \"2\""
        );
        // No previous header: quoted text stands alone.
        assert_eq!(d.extract_header("\"1\"", ""), "\"1\"");
        assert_eq!(d.extract_header("Ion Source", "Scan Event"), "Ion Source");
    }

    #[test]
    fn test_tsq_name_value() {
        let d = InstrumentModel::TsqVantage.dialect();
        assert_eq!(d.extract_name_value(" Spray Voltage \t 3500 "), pair("Spray Voltage", "3500"));
        assert_eq!(d.extract_name_value("Alone\t"), pair("Alone", ""));
    }

    #[test]
    fn test_qexactive_header() {
        let d = InstrumentModel::QExactive.dialect();
        assert_eq!(d.classify_line("=== Ion Source: ==="), LineKind::Header);
        assert_eq!(d.classify_line("Plain text"), LineKind::Observation);
        assert_eq!(d.extract_header("=== Ion Source: ===", ""), "Ion Source");
        assert_eq!(d.extract_header("===Vacuum===", ""), "Vacuum");
    }

    #[test]
    fn test_qexactive_name_value() {
        let d = InstrumentModel::QExactive.dialect();
        assert_eq!(
            d.extract_name_value("Capillary Temp. (°C):\t320.00"),
            pair("Capillary Temp. (?C)", "320.00")
        );
        assert_eq!(d.extract_name_value("Plain text"), pair("Plain text", ""));
    }

    #[test]
    fn test_fusion_header_with_colon_keeps_previous() {
        let d = InstrumentModel::OrbitrapFusion.dialect();
        assert_eq!(d.extract_header("Looks: like data", "Vacuum"), "Vacuum");
        assert_eq!(d.extract_header(" Ion Optics ", "Vacuum"), "Ion Optics");
        assert_eq!(d.classify_line("Ion Optics"), LineKind::Header);
        assert_eq!(d.classify_line("Gauge:"), LineKind::Observation);
    }

    #[test]
    fn test_unknown_never_has_headers() {
        let d = InstrumentModel::Unknown.dialect();
        assert_eq!(d.classify_line("Foo"), LineKind::Observation);
        assert_eq!(d.classify_line("=== X: ==="), LineKind::Observation);
        assert_eq!(
            d.extract_name_value(" Foo:\t1 "),
            pair(" Foo:\t1 ", "")
        );
    }
}
