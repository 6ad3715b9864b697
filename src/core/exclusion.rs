// RawSleuth - core/exclusion.rs
//
// Exclusion filter: drops unwanted observation table entries before
// aggregation. Core layer: accepts TOML strings, never touches the
// filesystem (platform::config reads exclusion files).
//
// Filtering is a pure set difference over the table keys, so the order of
// the configured entries never matters and re-filtering is a no-op.

use crate::core::model::PassKind;
use crate::core::table::{ObservationTable, TableKey};
use crate::util::constants::SECTION_JOINER;
use crate::util::error::ConfigError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Exclusion rules for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExclusionSpec {
    /// `"section - name"` entries removed on exact match.
    pub exact: Vec<String>,

    /// Name fragments; any entry whose name contains one is removed.
    pub partial: Vec<String>,
}

impl ExclusionSpec {
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.partial.is_empty()
    }

    /// Exact entries resolved to table keys.
    ///
    /// The entry is split at its last `" - "`: sections may themselves
    /// contain the joiner (merged TSQ Vantage headers), names practically
    /// never do. `" - Name"` addresses the empty section; an entry without
    /// the joiner addresses `("", entry)`.
    pub fn exact_keys(&self) -> HashSet<TableKey> {
        self.exact
            .iter()
            .map(|entry| match entry.rsplit_once(SECTION_JOINER) {
                Some((section, name)) => TableKey::new(section, name),
                None => match entry.strip_prefix(SECTION_JOINER.trim_start()) {
                    // "- Name": a leading joiner whose space was trimmed away.
                    Some(name) => TableKey::new("", name.trim_start()),
                    None => TableKey::new("", entry.as_str()),
                },
            })
            .collect()
    }

    /// Whether `key` is excluded by this spec.
    pub fn excludes(&self, key: &TableKey, exact: &HashSet<TableKey>) -> bool {
        exact.contains(key)
            || self
                .partial
                .iter()
                .any(|fragment| key.name.contains(fragment.as_str()))
    }

    /// Remove excluded entries in place. Returns the number removed.
    pub fn apply_in_place(&self, table: &mut ObservationTable) -> usize {
        if self.is_empty() {
            return 0;
        }
        let exact = self.exact_keys();
        let before = table.len();
        table.retain(|key| !self.excludes(key, &exact));
        before - table.len()
    }

    /// Filtered copy of `table`.
    pub fn apply(&self, table: &ObservationTable) -> ObservationTable {
        let mut filtered = table.clone();
        self.apply_in_place(&mut filtered);
        filtered
    }
}

/// Exclusion rules for both passes, as stored in an exclusion TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExclusionConfig {
    pub statuslog: ExclusionSpec,
    pub tunemethod: ExclusionSpec,
}

impl ExclusionConfig {
    pub fn for_pass(&self, pass: PassKind) -> &ExclusionSpec {
        match pass {
            PassKind::StatusLog => &self.statuslog,
            PassKind::TuneMethod => &self.tunemethod,
        }
    }

    /// The exclusion specification embedded in the binary.
    pub fn builtin() -> Self {
        let source = include_str!("../../exclusions/default.toml");
        match parse_exclusions(source, Path::new("<builtin>/default.toml")) {
            Ok(config) => config,
            Err(e) => {
                // A broken built-in file is a bug; extract unfiltered.
                tracing::error!(error = %e, "Failed to load built-in exclusions");
                Self::default()
            }
        }
    }
}

/// Parse an exclusion TOML document.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_exclusions(
    toml_content: &str,
    source_path: &Path,
) -> Result<ExclusionConfig, ConfigError> {
    let config: ExclusionConfig =
        toml::from_str(toml_content).map_err(|e| ConfigError::TomlParse {
            path: source_path.to_path_buf(),
            source: e,
        })?;

    tracing::debug!(
        source = %source_path.display(),
        statuslog_exact = config.statuslog.exact.len(),
        statuslog_partial = config.statuslog.partial.len(),
        tunemethod_exact = config.tunemethod.exact.len(),
        tunemethod_partial = config.tunemethod.partial.len(),
        "Exclusions parsed"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ObservationTable {
        let mut table = ObservationTable::new();
        table.push("Section", "Name", "1".to_string());
        table.push("Other", "Name", "2".to_string());
        table.push("Section", "Other", "3".to_string());
        table.push("Ambient", "Temperature", "20".to_string());
        table.push("", "RoomTemp", "21".to_string());
        table.push("", "Pressure", "1".to_string());
        table
    }

    fn spec(exact: &[&str], partial: &[&str]) -> ExclusionSpec {
        ExclusionSpec {
            exact: exact.iter().map(|s| s.to_string()).collect(),
            partial: partial.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_exact_removes_only_that_pair() {
        let filtered = spec(&["Section - Name"], &[]).apply(&sample_table());
        assert!(!filtered.contains("Section", "Name"));
        assert!(filtered.contains("Other", "Name"));
        assert!(filtered.contains("Section", "Other"));
        assert_eq!(filtered.len(), 5);
    }

    #[test]
    fn test_partial_matches_anywhere_in_name() {
        let filtered = spec(&[], &["Temp"]).apply(&sample_table());
        assert!(!filtered.contains("Ambient", "Temperature"));
        assert!(!filtered.contains("", "RoomTemp"));
        assert!(filtered.contains("", "Pressure"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let filtered = spec(&["section - name"], &["temp"]).apply(&sample_table());
        assert_eq!(filtered, sample_table());
    }

    #[test]
    fn test_empty_section_is_matchable() {
        let filtered = spec(&[" - Pressure"], &[]).apply(&sample_table());
        assert!(!filtered.contains("", "Pressure"));

        let filtered = spec(&["Pressure"], &[]).apply(&sample_table());
        assert!(!filtered.contains("", "Pressure"));
    }

    #[test]
    fn test_exact_split_at_last_joiner() {
        let mut table = ObservationTable::new();
        table.push("Scan Event - \"1\"", "Collision Energy", "25".to_string());
        let filtered =
            spec(&["Scan Event - \"1\" - Collision Energy"], &[]).apply(&table);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_filter_is_idempotent_and_order_independent() {
        let a = spec(&["Section - Name", "Other - Name"], &["Temp", "Press"]);
        let b = spec(&["Other - Name", "Section - Name"], &["Press", "Temp"]);

        let once = a.apply(&sample_table());
        let twice = a.apply(&once);
        assert_eq!(once, twice);
        assert_eq!(once, b.apply(&sample_table()));
        assert_eq!(once.len(), 1);
    }

    #[test]
    fn test_apply_in_place_reports_removed() {
        let mut table = sample_table();
        let removed = spec(&["Section - Name"], &["Temp"]).apply_in_place(&mut table);
        assert_eq!(removed, 3);
    }

    #[test]
    fn test_parse_exclusions_toml() {
        let toml = r#"
[statuslog]
exact = ["Ion Source - Spray Current"]
partial = ["Time"]

[tunemethod]
partial = ["Calibration"]
"#;
        let config = parse_exclusions(toml, Path::new("test.toml")).unwrap();
        assert_eq!(
            config.for_pass(PassKind::StatusLog).exact,
            vec!["Ion Source - Spray Current"]
        );
        assert!(config.for_pass(PassKind::TuneMethod).exact.is_empty());
        assert_eq!(
            config.for_pass(PassKind::TuneMethod).partial,
            vec!["Calibration"]
        );
    }

    #[test]
    fn test_parse_exclusions_invalid() {
        let result = parse_exclusions("[statuslog]\nexact = 3\n", Path::new("bad.toml"));
        assert!(matches!(result, Err(ConfigError::TomlParse { .. })));
    }

    #[test]
    fn test_builtin_loads() {
        let config = ExclusionConfig::builtin();
        assert!(config.statuslog.is_empty());
        assert!(config.tunemethod.is_empty());
    }
}
