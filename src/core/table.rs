// RawSleuth - core/table.rs
//
// Observation table: (section, name) -> raw values, in stream order.
// Core layer: accepts text that has already been read, never touches
// processes or files.

use crate::core::dialect::Dialect;
use crate::core::model::{InstrumentModel, LineKind};
use std::collections::BTreeMap;

/// Key of one observation table entry.
///
/// `section` is empty when no header was active.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub section: String,
    pub name: String,
}

impl TableKey {
    pub fn new(section: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            name: name.into(),
        }
    }
}

/// Raw observations of one pass.
///
/// Values keep their order of appearance, duplicates included. Keys iterate
/// in sorted order so everything built from the table is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationTable {
    entries: BTreeMap<TableKey, Vec<String>>,
}

impl ObservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one observation to the `(section, name)` entry.
    pub fn push(&mut self, section: &str, name: &str, value: String) {
        self.entries
            .entry(TableKey::new(section, name))
            .or_default()
            .push(value);
    }

    /// Raw values recorded for `(section, name)`.
    pub fn get(&self, section: &str, name: &str) -> Option<&[String]> {
        self.entries
            .get(&TableKey::new(section, name))
            .map(Vec::as_slice)
    }

    pub fn contains(&self, section: &str, name: &str) -> bool {
        self.entries.contains_key(&TableKey::new(section, name))
    }

    /// Number of `(section, name)` entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of recorded observations across all entries.
    pub fn observation_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableKey, &[String])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&TableKey) -> bool) {
        self.entries.retain(|key, _| keep(key));
    }
}

impl IntoIterator for ObservationTable {
    type Item = (TableKey, Vec<String>);
    type IntoIter = std::collections::btree_map::IntoIter<TableKey, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Incremental table builder driven one line at a time.
///
/// Holds the active section: headers replace it (through the model's
/// header rule), separators clear it, observations are filed under it.
#[derive(Debug)]
pub struct TableBuilder {
    dialect: &'static dyn Dialect,
    section: String,
    table: ObservationTable,
    lines_processed: u64,
}

impl TableBuilder {
    pub fn new(model: InstrumentModel) -> Self {
        Self {
            dialect: model.dialect(),
            section: String::new(),
            table: ObservationTable::new(),
            lines_processed: 0,
        }
    }

    /// Currently active section (empty when none).
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Feed one line (without its line terminator) and return its class.
    pub fn push_line(&mut self, line: &str) -> LineKind {
        let line = line.strip_suffix('\r').unwrap_or(line);
        self.lines_processed += 1;

        let kind = self.dialect.classify_line(line);
        match kind {
            LineKind::Separator => self.section.clear(),
            LineKind::Header => {
                self.section = self.dialect.extract_header(line, &self.section);
            }
            LineKind::Observation => {
                let (name, value) = self.dialect.extract_name_value(line);
                self.table.push(&self.section, &name, value);
            }
        }
        kind
    }

    pub fn lines_processed(&self) -> u64 {
        self.lines_processed
    }

    pub fn finish(self) -> ObservationTable {
        tracing::trace!(
            lines = self.lines_processed,
            entries = self.table.len(),
            "Observation table complete"
        );
        self.table
    }
}

/// Build the observation table of a fully drained tool output.
pub fn build_table(text: &str, model: InstrumentModel) -> ObservationTable {
    let mut builder = TableBuilder::new(model);
    for line in text.lines() {
        builder.push_line(line);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orbitrap_header_scopes_observations() {
        let table = build_table("Foo\nBar: 1\nBar: 2\n", InstrumentModel::LtqOrbitrap);
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get("Foo", "Bar"),
            Some(&["1".to_string(), "2".to_string()][..])
        );
    }

    #[test]
    fn test_separator_resets_section() {
        let mut builder = TableBuilder::new(InstrumentModel::LtqOrbitrap);
        builder.push_line("Vacuum");
        assert_eq!(builder.section(), "Vacuum");
        assert_eq!(builder.push_line("   "), LineKind::Separator);
        assert_eq!(builder.section(), "");

        builder.push_line("Ion Source");
        assert_eq!(builder.push_line("--END_OF_SECTION"), LineKind::Separator);
        assert_eq!(builder.section(), "");

        builder.push_line("Gauge: 3");
        let table = builder.finish();
        assert_eq!(table.get("", "Gauge"), Some(&["3".to_string()][..]));
    }

    #[test]
    fn test_values_keep_stream_order_and_duplicates() {
        let text = "Temp:\t21.5\nTemp:\t20.0\nTemp:\t21.5\nTemp:\n";
        let table = build_table(text, InstrumentModel::OrbitrapXl);
        assert_eq!(
            table.get("", "Temp").unwrap(),
            &["21.5", "20.0", "21.5", ""]
        );
        assert_eq!(table.observation_count(), 4);
    }

    #[test]
    fn test_crlf_lines() {
        let table = build_table("Vacuum\r\nGauge:\t1e-5\r\n", InstrumentModel::LtqOrbitrap);
        assert_eq!(table.get("Vacuum", "Gauge"), Some(&["1e-5".to_string()][..]));
    }

    #[test]
    fn test_tsq_merged_headers() {
        let text = "Scan Event\n\"1\"\nCollision Energy\t25\n\"2\"\nCollision Energy\t30\n";
        let table = build_table(text, InstrumentModel::TsqVantage);
        assert_eq!(
            table.get("Scan Event - \"1\"", "Collision Energy"),
            Some(&["25".to_string()][..])
        );
        assert_eq!(
            table.get("Scan Event - \"2\"", "Collision Energy"),
            Some(&["30".to_string()][..])
        );
    }

    #[test]
    fn test_unknown_model_keeps_whole_lines() {
        let table = build_table("Header\nA:\t1\n", InstrumentModel::Unknown);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("", "Header"), Some(&[String::new()][..]));
        assert_eq!(table.get("", "A:\t1"), Some(&[String::new()][..]));
    }

    #[test]
    fn test_retain() {
        let mut table = build_table("A: 1\nB: 2\n", InstrumentModel::LtqOrbitrap);
        table.retain(|key| key.name != "A");
        assert!(!table.contains("", "A"));
        assert!(table.contains("", "B"));
    }
}
