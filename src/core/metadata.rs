// RawSleuth - core/metadata.rs
//
// Reads the two-line metadata stream produced by the metadata tool:
//
//   <label>\t2020-Jan-01 10:00:00 UTC
//   <label>\tLTQ Orbitrap
//
// Line 1 carries the sample date, line 2 the instrument model tag. Any
// failure here is fatal for the extraction of that file: without a date and
// a model no Run can be built.

use crate::core::model::InstrumentModel;
use crate::util::constants::{FIELD_DELIMITER, SAMPLE_DATE_FORMAT};
use crate::util::error::ExtractionError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Run-level facts read from the metadata stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    /// Acquisition timestamp, normalised to UTC.
    pub sample_date: DateTime<Utc>,

    pub model: InstrumentModel,

    /// Model tag exactly as reported (useful when `model` is `Unknown`).
    pub model_tag: String,
}

/// Parse the metadata stream of `file`.
pub fn read_metadata(text: &str, file: &Path) -> Result<RunMetadata, ExtractionError> {
    let fail = |reason: String| ExtractionError::MetadataExtractionFailed {
        file: file.to_path_buf(),
        reason,
    };

    let mut lines = text.lines();
    let date_line = lines
        .next()
        .ok_or_else(|| fail("metadata output is empty".to_string()))?;
    let model_line = lines
        .next()
        .ok_or_else(|| fail("metadata output has no model line".to_string()))?;

    let date_field = second_field(date_line)
        .ok_or_else(|| fail(format!("date line has no value field: '{date_line}'")))?;
    let sample_date = parse_sample_date(date_field).map_err(fail)?;

    let model_tag = second_field(model_line)
        .ok_or_else(|| fail(format!("model line has no value field: '{model_line}'")))?;
    let model = InstrumentModel::from_tag(model_tag);
    if model == InstrumentModel::Unknown {
        tracing::warn!(
            file = %file.display(),
            model = model_tag,
            "Unrecognised instrument model, extracting without section headers"
        );
    }

    tracing::debug!(
        file = %file.display(),
        sample_date = %sample_date,
        model = %model,
        "Metadata read"
    );

    Ok(RunMetadata {
        sample_date,
        model,
        model_tag: model_tag.to_string(),
    })
}

fn second_field(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    line.split(FIELD_DELIMITER)
        .nth(1)
        .map(str::trim)
        .filter(|field| !field.is_empty())
}

/// Parse `2020-Jan-01 10:00:00 UTC` style timestamps into UTC.
///
/// Month names are matched case-insensitively. The zone token is `UTC`,
/// `GMT`, `UT`, `Z`, one of the common European/North-American
/// abbreviations, or a numeric offset (`+0100`, `+01:00`, `GMT+01:00`).
pub fn parse_sample_date(raw: &str) -> Result<DateTime<Utc>, String> {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    let re = DATE_RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-[A-Za-z]{3}-\d{1,2}\s+\d{1,2}:\d{2}:\d{2})\s+(\S+)$")
            .expect("sample date regex is valid")
    });

    let trimmed = raw.trim();
    let caps = re
        .captures(trimmed)
        .ok_or_else(|| format!("'{trimmed}' does not match 'yyyy-Mon-dd HH:MM:SS zone'"))?;

    let naive = NaiveDateTime::parse_from_str(&caps[1], SAMPLE_DATE_FORMAT)
        .map_err(|e| format!("invalid date '{}': {e}", &caps[1]))?;
    let offset = zone_offset(&caps[2]).ok_or_else(|| format!("unknown time zone '{}'", &caps[2]))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("'{trimmed}' is not a valid local time"))
}

/// Resolve a zone token to a fixed offset from UTC.
fn zone_offset(token: &str) -> Option<FixedOffset> {
    const HOUR: i32 = 3600;

    let upper = token.to_ascii_uppercase();
    let hours = match upper.as_str() {
        "UTC" | "GMT" | "UT" | "Z" => Some(0),
        "CET" => Some(1),
        "CEST" => Some(2),
        "EST" => Some(-5),
        "EDT" => Some(-4),
        "CST" => Some(-6),
        "CDT" => Some(-5),
        "MST" => Some(-7),
        "MDT" => Some(-6),
        "PST" => Some(-8),
        "PDT" => Some(-7),
        _ => None,
    };
    if let Some(h) = hours {
        return FixedOffset::east_opt(h * HOUR);
    }

    let numeric = upper
        .strip_prefix("GMT")
        .or_else(|| upper.strip_prefix("UTC"))
        .unwrap_or(upper.as_str());
    parse_numeric_offset(numeric)
}

/// `+0100`, `-05:00`, `+1` style offsets.
fn parse_numeric_offset(token: &str) -> Option<FixedOffset> {
    let (sign, rest) = match token.as_bytes().first()? {
        b'+' => (1, &token[1..]),
        b'-' => (-1, &token[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    if hours.is_empty() || hours.len() > 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_read_metadata() {
        let text = "Date\t2020-Jan-01 10:00:00 UTC\nModel\tLTQ Orbitrap\n";
        let meta = read_metadata(text, Path::new("a.raw")).unwrap();
        assert_eq!(meta.sample_date, utc(2020, 1, 1, 10, 0, 0));
        assert_eq!(meta.model, InstrumentModel::LtqOrbitrap);
        assert_eq!(meta.model_tag, "LTQ Orbitrap");
    }

    #[test]
    fn test_unknown_model_is_not_an_error() {
        let text = "Date\t2020-Jan-01 10:00:00 UTC\nModel\tExploris 480\n";
        let meta = read_metadata(text, Path::new("a.raw")).unwrap();
        assert_eq!(meta.model, InstrumentModel::Unknown);
        assert_eq!(meta.model_tag, "Exploris 480");
    }

    #[test]
    fn test_missing_lines_fail() {
        for text in ["", "Date\t2020-Jan-01 10:00:00 UTC\n"] {
            let result = read_metadata(text, Path::new("a.raw"));
            assert!(matches!(
                result,
                Err(ExtractionError::MetadataExtractionFailed { .. })
            ));
        }
    }

    #[test]
    fn test_missing_field_fails() {
        let text = "Date 2020-Jan-01 10:00:00 UTC\nModel\tLTQ Orbitrap\n";
        assert!(read_metadata(text, Path::new("a.raw")).is_err());

        let text = "Date\t2020-Jan-01 10:00:00 UTC\nModel\n";
        assert!(read_metadata(text, Path::new("a.raw")).is_err());
    }

    #[test]
    fn test_unparsable_date_fails() {
        let text = "Date\t01/01/2020 10:00\nModel\tLTQ Orbitrap\n";
        let err = read_metadata(text, Path::new("a.raw")).unwrap_err();
        assert!(err.to_string().contains("a.raw"));
    }

    #[test]
    fn test_zone_abbreviations() {
        assert_eq!(
            parse_sample_date("2014-Mar-05 14:30:00 CET").unwrap(),
            utc(2014, 3, 5, 13, 30, 0)
        );
        assert_eq!(
            parse_sample_date("2014-Jul-05 08:00:00 PDT").unwrap(),
            utc(2014, 7, 5, 15, 0, 0)
        );
        assert_eq!(
            parse_sample_date("2014-jul-05 08:00:00 gmt").unwrap(),
            utc(2014, 7, 5, 8, 0, 0)
        );
    }

    #[test]
    fn test_numeric_offsets() {
        let expected = utc(2014, 3, 5, 13, 30, 0);
        assert_eq!(parse_sample_date("2014-Mar-05 14:30:00 +0100").unwrap(), expected);
        assert_eq!(parse_sample_date("2014-Mar-05 14:30:00 +01:00").unwrap(), expected);
        assert_eq!(parse_sample_date("2014-Mar-05 14:30:00 GMT+01:00").unwrap(), expected);
        assert_eq!(
            parse_sample_date("2014-Mar-05 08:30:00 -05:00").unwrap(),
            expected
        );
    }

    #[test]
    fn test_unknown_zone_fails() {
        assert!(parse_sample_date("2014-Mar-05 14:30:00 XYZ").is_err());
        assert!(parse_sample_date("2014-Mar-05 14:30:00").is_err());
    }

    #[test]
    fn test_invalid_calendar_date_fails() {
        assert!(parse_sample_date("2014-Feb-30 14:30:00 UTC").is_err());
        assert!(parse_sample_date("2014-Foo-05 14:30:00 UTC").is_err());
    }
}
