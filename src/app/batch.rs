// RawSleuth - app/batch.rs
//
// Batch extraction: many raw files into one shared entity graph.
//
// Files are extracted in parallel on the rayon pool. All extractions share a
// single `Mutex<EntityGraph>`, so properties are de-duplicated across the
// whole batch. A failed file is reported and skipped; it never aborts the
// batch and never leaves anything behind in the graph.

use crate::app::extract::{ExtractionRequest, Extractor};
use crate::core::discovery::{self, DiscoveryConfig};
use crate::core::graph::{EntityGraph, RunId};
use crate::util::error::{DiscoveryError, ExtractionError};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Result of a batch extraction.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub graph: EntityGraph,

    /// Successfully extracted files, in request order.
    pub runs: Vec<(PathBuf, RunId)>,

    /// Files that failed, in request order.
    pub failures: Vec<(PathBuf, ExtractionError)>,
}

impl BatchOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Extract every request into one graph.
pub fn extract_batch(extractor: &Extractor, requests: &[ExtractionRequest]) -> BatchOutcome {
    extract_batch_into(extractor, EntityGraph::new(), requests)
}

/// Extract every request into an existing graph.
pub fn extract_batch_into(
    extractor: &Extractor,
    graph: EntityGraph,
    requests: &[ExtractionRequest],
) -> BatchOutcome {
    tracing::info!(files = requests.len(), "Batch extraction starting");
    let shared = Mutex::new(graph);

    let results: Vec<(PathBuf, Result<RunId, ExtractionError>)> = requests
        .par_iter()
        .map(|request| {
            let result = extractor.extract_into(&shared, request);
            if let Err(ref e) = result {
                tracing::warn!(
                    file = %request.raw_file.display(),
                    error = %e,
                    "Extraction failed"
                );
            }
            (request.raw_file.clone(), result)
        })
        .collect();

    let mut outcome = BatchOutcome {
        graph: shared.into_inner().unwrap_or_else(PoisonError::into_inner),
        ..Default::default()
    };
    for (path, result) in results {
        match result {
            Ok(run) => outcome.runs.push((path, run)),
            Err(e) => outcome.failures.push((path, e)),
        }
    }

    let (instruments, runs, properties, values) = outcome.graph.counts();
    tracing::info!(
        extracted = outcome.runs.len(),
        failed = outcome.failures.len(),
        instruments,
        runs,
        properties,
        values,
        "Batch extraction complete"
    );
    outcome
}

/// Expand input paths into raw files: files are taken as given, directories
/// are searched with `discovery`.
///
/// Returns the files (duplicates removed, input order kept) and discovery
/// warnings.
pub fn collect_raw_files(
    inputs: &[PathBuf],
    config: &DiscoveryConfig,
) -> Result<(Vec<PathBuf>, Vec<String>), DiscoveryError> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut warnings = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let (found, found_warnings) = discovery::discover_raw_files(input, config)?;
            files.extend(found);
            warnings.extend(found_warnings);
        } else {
            files.push(input.clone());
        }
    }

    let mut seen = std::collections::HashSet::new();
    files.retain(|f| seen.insert(dedup_key(f)));
    Ok((files, warnings))
}

fn dedup_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
