// RawSleuth - app/extract.rs
//
// Extraction of one raw file into the entity graph.
//
// Pipeline per file:
//   1. validate the path (extension, existence) and the names to record
//   2. metadata tool -> sample date + instrument model (fatal on failure)
//   3. status-log and tune-method passes, concurrently on the rayon pool:
//      tool output -> observation table -> exclusion -> aggregates
//   4. only if both passes succeeded: lock the graph and add the
//      instrument, run, metadata and values in one go
//
// Nothing touches the graph before step 4, so a failed extraction leaves no
// trace and no partially linked run is ever visible to other threads.

use crate::core::assemble;
use crate::core::exclusion::ExclusionConfig;
use crate::core::graph::{self, EntityGraph, RunId};
use crate::core::metadata::{self, RunMetadata};
use crate::core::model::{Aggregate, Cv, InstrumentModel, PassKind};
use crate::core::stats;
use crate::core::table::{self, TableKey};
use crate::platform::process::ToolRunner;
use crate::platform::tools::ToolSetup;
use crate::util::constants;
use crate::util::error::{ExtractionError, GraphError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

// =============================================================================
// Request / result
// =============================================================================

/// What to extract and where to file it.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub raw_file: PathBuf,

    /// Instrument the run is added to (created on first use).
    pub instrument_name: String,

    /// Run name; defaults to the raw file name without extension.
    pub run_name: Option<String>,

    /// Extra name/value pairs recorded on the run.
    pub metadata: Vec<(String, String)>,
}

impl ExtractionRequest {
    pub fn new(raw_file: impl Into<PathBuf>, instrument_name: impl Into<String>) -> Self {
        Self {
            raw_file: raw_file.into(),
            instrument_name: instrument_name.into(),
            run_name: None,
            metadata: Vec::new(),
        }
    }

    pub fn with_run_name(mut self, name: impl Into<String>) -> Self {
        self.run_name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((name.into(), value.into()));
        self
    }
}

/// A single-file extraction: its own graph and the run it produced.
#[derive(Debug)]
pub struct Extraction {
    pub graph: EntityGraph,
    pub run: RunId,
}

/// Aggregated entries of one pass, in table key order.
type PassValues = Vec<(TableKey, Aggregate)>;

// =============================================================================
// Extractor
// =============================================================================

/// Extracts raw files through a `ToolRunner`.
///
/// Shareable across threads; one extractor serves a whole batch.
pub struct Extractor {
    runner: Arc<dyn ToolRunner>,
    exclusions: ExclusionConfig,
    setup: Option<Arc<ToolSetup>>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("exclusions", &self.exclusions)
            .field("setup", &self.setup)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    pub fn new(runner: Arc<dyn ToolRunner>, exclusions: ExclusionConfig) -> Self {
        Self {
            runner,
            exclusions,
            setup: None,
        }
    }

    /// Provision the tool directory (once) before the first extraction.
    pub fn with_setup(mut self, setup: Arc<ToolSetup>) -> Self {
        self.setup = Some(setup);
        self
    }

    pub fn exclusions(&self) -> &ExclusionConfig {
        &self.exclusions
    }

    /// Extract one raw file into a fresh graph.
    pub fn extract(&self, request: &ExtractionRequest) -> Result<Extraction, ExtractionError> {
        let graph = Mutex::new(EntityGraph::new());
        let run = self.extract_into(&graph, request)?;
        let graph = graph.into_inner().unwrap_or_else(PoisonError::into_inner);
        Ok(Extraction { graph, run })
    }

    /// Extract one raw file into a shared graph.
    ///
    /// The lock is taken only once both passes have finished, so concurrent
    /// extractions run their tools in parallel and serialise only on the
    /// final graph update.
    pub fn extract_into(
        &self,
        graph: &Mutex<EntityGraph>,
        request: &ExtractionRequest,
    ) -> Result<RunId, ExtractionError> {
        let raw_file = validate_raw_file(&request.raw_file)?;
        let run_name = match &request.run_name {
            Some(name) => name.clone(),
            None => file_stem(&raw_file),
        };
        check_graph_fields(request, &run_name)?;
        tracing::info!(file = %raw_file.display(), "Extracting raw file");

        if let Some(setup) = &self.setup {
            setup.ensure_ready()?;
        }

        let meta = self.read_metadata(&raw_file)?;

        let (status_log, tune_method) = rayon::join(
            || self.run_pass(PassKind::StatusLog, &raw_file, meta.model),
            || self.run_pass(PassKind::TuneMethod, &raw_file, meta.model),
        );
        let (status_log, tune_method) = match (status_log, tune_method) {
            (Ok(s), Ok(t)) => (s, t),
            (Err(s), Err(t)) => {
                return Err(ExtractionError::BothPassesFailed {
                    status_log: Box::new(s),
                    tune_method: Box::new(t),
                })
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => return Err(e),
        };

        let mut graph = graph.lock().unwrap_or_else(PoisonError::into_inner);
        let instrument =
            graph.find_or_add_instrument(&request.instrument_name, meta.model, Cv::psi_ms())?;
        let run = graph.add_run(
            instrument,
            &run_name,
            &raw_file.to_string_lossy(),
            meta.sample_date,
        )?;
        for (name, value) in &request.metadata {
            graph.add_metadata(run, name, value)?;
        }

        let imon = Cv::imon();
        let mut values = 0;
        for (pass, entries) in [
            (PassKind::StatusLog, &status_log),
            (PassKind::TuneMethod, &tune_method),
        ] {
            values += assemble::add_pass_values(
                &mut graph,
                run,
                pass,
                entries.iter().map(|(k, a)| (k, a)),
                &imon,
            )?;
        }

        tracing::info!(
            file = %raw_file.display(),
            run = %run_name,
            instrument = %request.instrument_name,
            model = %meta.model,
            values,
            "Raw file extracted"
        );
        Ok(run)
    }

    fn read_metadata(&self, raw_file: &Path) -> Result<RunMetadata, ExtractionError> {
        let text = self
            .runner
            .run(constants::METADATA_TOOL, raw_file)
            .map_err(|failure| ExtractionError::MetadataExtractionFailed {
                file: raw_file.to_path_buf(),
                reason: format!("{}: {failure}", constants::METADATA_TOOL),
            })?;
        metadata::read_metadata(&text, raw_file)
    }

    /// One pass: tool output -> table -> exclusion -> aggregates.
    fn run_pass(
        &self,
        pass: PassKind,
        raw_file: &Path,
        model: InstrumentModel,
    ) -> Result<PassValues, ExtractionError> {
        let text = self
            .runner
            .run(pass.tool(), raw_file)
            .map_err(|failure| ExtractionError::ExtractionProcessFailed {
                file: raw_file.to_path_buf(),
                tool: pass.tool(),
                failure,
            })?;

        let mut table = table::build_table(&text, model);
        let entries = table.len();
        let excluded = self.exclusions.for_pass(pass).apply_in_place(&mut table);

        let values: PassValues = table
            .into_iter()
            .filter_map(|(key, raw)| stats::aggregate_strings(&raw).map(|agg| (key, agg)))
            .collect();

        tracing::debug!(
            file = %raw_file.display(),
            pass = %pass,
            entries,
            excluded,
            aggregated = values.len(),
            "Pass complete"
        );
        Ok(values)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Check extension and existence; return the canonical path.
pub fn validate_raw_file(path: &Path) -> Result<PathBuf, ExtractionError> {
    let invalid = |reason: String| ExtractionError::InvalidRawFile {
        path: path.to_path_buf(),
        reason,
    };

    let has_raw_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(constants::RAW_FILE_EXTENSION));
    if !has_raw_extension {
        return Err(invalid(format!(
            "expected a .{} file",
            constants::RAW_FILE_EXTENSION
        )));
    }
    if !path.is_file() {
        return Err(invalid("file does not exist".to_string()));
    }

    path.canonicalize()
        .map_err(|e| invalid(format!("cannot resolve path: {e}")))
}

/// Names and values the graph would reject, checked before any tool runs so
/// the locked graph update cannot fail halfway.
fn check_graph_fields(request: &ExtractionRequest, run_name: &str) -> Result<(), GraphError> {
    graph::require_non_empty("instrument name", &request.instrument_name)?;
    graph::require_non_empty("run name", run_name)?;
    for (name, value) in &request.metadata {
        graph::require_non_empty("metadata name", name)?;
        graph::require_non_empty("metadata value", value)?;
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::error::ToolFailure;
    use std::collections::HashMap;
    use std::fs;

    /// Canned tool output keyed by tool name; absent tools fail to spawn.
    struct CannedRunner(HashMap<&'static str, String>);

    impl ToolRunner for CannedRunner {
        fn run(&self, tool: &'static str, _raw_file: &Path) -> Result<String, ToolFailure> {
            self.0.get(tool).cloned().ok_or_else(|| {
                ToolFailure::Spawn(std::io::Error::new(std::io::ErrorKind::NotFound, tool))
            })
        }
    }

    const METADATA: &str = "Date\t2020-Jan-01 10:00:00 UTC\nModel\tLTQ Orbitrap\n";

    fn runner(outputs: &[(&'static str, &str)]) -> Arc<dyn ToolRunner> {
        Arc::new(CannedRunner(
            outputs.iter().map(|(t, o)| (*t, o.to_string())).collect(),
        ))
    }

    fn raw_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"raw").unwrap();
        path
    }

    #[test]
    fn test_validate_raw_file() {
        let dir = tempfile::tempdir().unwrap();
        let ok = raw_file(dir.path(), "a.RAW");
        assert!(validate_raw_file(&ok).is_ok());

        let wrong = raw_file(dir.path(), "a.txt");
        assert!(matches!(
            validate_raw_file(&wrong),
            Err(ExtractionError::InvalidRawFile { .. })
        ));
        assert!(validate_raw_file(&dir.path().join("missing.raw")).is_err());
    }

    #[test]
    fn test_extract_builds_run_with_both_passes() {
        let dir = tempfile::tempdir().unwrap();
        let file = raw_file(dir.path(), "sample01.raw");
        let extractor = Extractor::new(
            runner(&[
                (constants::METADATA_TOOL, METADATA),
                (constants::STATUS_LOG_TOOL, "Vacuum\nGauge:\t1.5\nGauge:\t2.5\n"),
                (constants::TUNE_METHOD_TOOL, "Source\nPolarity:\tPositive\n"),
            ]),
            ExclusionConfig::default(),
        );

        let Extraction { graph, run } = extractor
            .extract(&ExtractionRequest::new(&file, "Orbi").with_metadata("operator", "kl"))
            .unwrap();

        let run_ref = graph.run(run).unwrap();
        assert_eq!(run_ref.name(), "sample01");
        assert_eq!(run_ref.values().len(), 2);
        assert_eq!(run_ref.metadata()["operator"], "kl");
        assert!(run_ref.storage_name().ends_with("sample01.raw"));

        let kinds: Vec<_> = graph.properties().map(|(_, p)| (p.name(), p.kind())).collect();
        assert!(kinds.contains(&("Vacuum - Gauge", "statuslog")));
        assert!(kinds.contains(&("Source - Polarity", "tunemethod")));

        let instrument = graph.instrument(run_ref.instrument()).unwrap();
        assert_eq!(instrument.name(), "Orbi");
        assert_eq!(instrument.model(), InstrumentModel::LtqOrbitrap);
        assert_eq!(instrument.properties().len(), 2);
    }

    #[test]
    fn test_exclusions_applied_per_pass() {
        let dir = tempfile::tempdir().unwrap();
        let file = raw_file(dir.path(), "a.raw");
        let mut exclusions = ExclusionConfig::default();
        exclusions.statuslog.partial.push("Gauge".to_string());

        let extractor = Extractor::new(
            runner(&[
                (constants::METADATA_TOOL, METADATA),
                (constants::STATUS_LOG_TOOL, "Gauge:\t1\nTemp:\t2\n"),
                (constants::TUNE_METHOD_TOOL, "Gauge:\t3\n"),
            ]),
            exclusions,
        );
        let Extraction { graph, .. } = extractor
            .extract(&ExtractionRequest::new(&file, "Orbi"))
            .unwrap();

        let names: Vec<_> = graph
            .properties()
            .map(|(_, p)| format!("{}/{}", p.kind(), p.name()))
            .collect();
        assert_eq!(names.len(), 2, "got {names:?}");
        assert!(names.contains(&"statuslog/Temp".to_string()));
        assert!(names.contains(&"tunemethod/Gauge".to_string()));
    }

    #[test]
    fn test_one_failed_pass_is_fatal_and_leaves_no_run() {
        let dir = tempfile::tempdir().unwrap();
        let file = raw_file(dir.path(), "a.raw");
        let extractor = Extractor::new(
            runner(&[
                (constants::METADATA_TOOL, METADATA),
                (constants::STATUS_LOG_TOOL, "Temp:\t2\n"),
            ]),
            ExclusionConfig::default(),
        );

        let graph = Mutex::new(EntityGraph::new());
        let err = extractor
            .extract_into(&graph, &ExtractionRequest::new(&file, "Orbi"))
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::ExtractionProcessFailed {
                tool: constants::TUNE_METHOD_TOOL,
                ..
            }
        ));
        assert_eq!(graph.lock().unwrap().counts(), (0, 0, 0, 0));
    }

    #[test]
    fn test_metadata_tool_failure_is_metadata_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = raw_file(dir.path(), "a.raw");
        let extractor = Extractor::new(runner(&[]), ExclusionConfig::default());
        let err = extractor
            .extract(&ExtractionRequest::new(&file, "Orbi"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::MetadataExtractionFailed { .. }));
    }

    #[test]
    fn test_rejected_request_fields_leave_graph_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let file = raw_file(dir.path(), "a.raw");
        let extractor = Extractor::new(
            runner(&[
                (constants::METADATA_TOOL, METADATA),
                (constants::STATUS_LOG_TOOL, "Temp:\t2\n"),
                (constants::TUNE_METHOD_TOOL, ""),
            ]),
            ExclusionConfig::default(),
        );
        let graph = Mutex::new(EntityGraph::new());

        let requests = [
            ExtractionRequest::new(&file, "Orbi").with_metadata("", "v"),
            ExtractionRequest::new(&file, "Orbi").with_metadata("operator", ""),
            ExtractionRequest::new(&file, "Orbi").with_run_name(" "),
            ExtractionRequest::new(&file, ""),
        ];
        for request in &requests {
            let err = extractor.extract_into(&graph, request).unwrap_err();
            assert!(
                matches!(err, ExtractionError::Graph(GraphError::InvalidArgument { .. })),
                "got {err:?}"
            );
            assert_eq!(graph.lock().unwrap().counts(), (0, 0, 0, 0));
        }

        // The same graph still accepts a valid request afterwards.
        extractor
            .extract_into(&graph, &ExtractionRequest::new(&file, "Orbi"))
            .unwrap();
        assert_eq!(graph.lock().unwrap().counts(), (1, 1, 1, 1));
    }

    #[test]
    fn test_same_file_twice_into_one_graph_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = raw_file(dir.path(), "a.raw");
        let extractor = Extractor::new(
            runner(&[
                (constants::METADATA_TOOL, METADATA),
                (constants::STATUS_LOG_TOOL, "Temp:\t2\n"),
                (constants::TUNE_METHOD_TOOL, ""),
            ]),
            ExclusionConfig::default(),
        );
        let graph = Mutex::new(EntityGraph::new());
        let request = ExtractionRequest::new(&file, "Orbi");
        extractor.extract_into(&graph, &request).unwrap();
        let err = extractor.extract_into(&graph, &request).unwrap_err();
        assert!(matches!(err, ExtractionError::Graph(_)));

        let renamed = request.clone().with_run_name("a-again");
        assert!(extractor.extract_into(&graph, &renamed).is_ok());
        assert_eq!(graph.lock().unwrap().counts(), (1, 2, 1, 2));
    }
}
