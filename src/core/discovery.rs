// RawSleuth - core/discovery.rs
//
// Recursive directory traversal to find raw files for batch extraction.
//
// Uses `walkdir` for traversal and `glob` patterns (matched against the file
// name only, case-insensitively) to select files. Reads metadata only, never
// file contents.
//
//   - Per-entry I/O errors are non-fatal and collected as warnings.
//   - max_depth and max_files are clamped to named absolute bounds.

use crate::util::constants;
use crate::util::error::DiscoveryError;
use std::path::{Path, PathBuf};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a discovery operation.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Maximum directory recursion depth (the root is depth 0).
    pub max_depth: usize,

    /// Maximum number of files to return.
    pub max_files: usize,

    /// Glob patterns (file name only) a file must match to be included.
    pub include_patterns: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_files: constants::DEFAULT_MAX_FILES,
            include_patterns: constants::DEFAULT_INCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Discover raw files under `root`.
///
/// Returns the matching paths sorted by path, plus human-readable warnings
/// for entries that could not be read and for truncation at `max_files`.
///
/// Returns `Err` only if the root itself is unusable.
pub fn discover_raw_files(
    root: &Path,
    config: &DiscoveryConfig,
) -> Result<(Vec<PathBuf>, Vec<String>), DiscoveryError> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(DiscoveryError::NotADirectory {
                path: root.to_path_buf(),
            })
        }
        Err(_) => {
            return Err(DiscoveryError::RootNotFound {
                path: root.to_path_buf(),
            })
        }
    }

    let max_files = config
        .max_files
        .clamp(constants::MIN_MAX_FILES, constants::ABSOLUTE_MAX_FILES);
    let max_depth = config.max_depth.min(constants::ABSOLUTE_MAX_DEPTH);

    tracing::debug!(
        root = %root.display(),
        max_depth,
        max_files,
        include = ?config.include_patterns,
        "Discovery starting"
    );

    let include_pats = compile_patterns(&config.include_patterns);
    let match_options = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let mut files: Vec<PathBuf> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let walker = walkdir::WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false);

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => {
                return Err(DiscoveryError::Traversal {
                    path: root.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Discovery warning");
                warnings.push(msg);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => {
                warnings.push(format!("Skipping '{}': non-UTF-8 filename", path.display()));
                continue;
            }
        };

        if !is_included(file_name, &include_pats, match_options) {
            tracing::trace!(file = file_name, "Not matched by include patterns");
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();

    let total_found = files.len();
    if total_found > max_files {
        files.truncate(max_files);
        warnings.push(format!(
            "{total_found} raw files were found but the limit is {max_files}. \
             Only the first {max_files} (by path) will be extracted."
        ));
        tracing::info!(total_found, limit = max_files, "Raw file list truncated");
    }

    tracing::debug!(
        total_found,
        files = files.len(),
        warnings = warnings.len(),
        "Discovery complete"
    );

    Ok((files, warnings))
}

// =============================================================================
// Glob helpers
// =============================================================================

/// Compile glob patterns; invalid ones are logged and skipped.
fn compile_patterns(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern = p, error = %e, "Invalid glob pattern, skipping");
                None
            }
        })
        .collect()
}

/// An empty include list includes everything.
fn is_included(file_name: &str, include_pats: &[glob::Pattern], options: glob::MatchOptions) -> bool {
    include_pats.is_empty()
        || include_pats
            .iter()
            .any(|p| p.matches_with(file_name, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_temp_tree() -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        fs::write(root.join("a.raw"), b"raw").expect("write a.raw");
        fs::write(root.join("B.RAW"), b"raw").expect("write B.RAW");
        fs::write(root.join("notes.txt"), b"notes").expect("write notes.txt");

        let sub = root.join("2020");
        fs::create_dir(&sub).expect("mkdir 2020");
        fs::write(sub.join("c.raw"), b"raw").expect("write c.raw");

        dir
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.file_name().unwrap().to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_discovers_raw_files_case_insensitively() {
        let dir = make_temp_tree();
        let (files, warnings) = discover_raw_files(dir.path(), &DiscoveryConfig::default()).unwrap();
        let names = names(&files);

        assert_eq!(files.len(), 3, "got {names:?}");
        assert!(names.contains(&"a.raw".to_string()));
        assert!(names.contains(&"B.RAW".to_string()));
        assert!(names.contains(&"c.raw".to_string()));
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_results_sorted() {
        let dir = make_temp_tree();
        let (files, _) = discover_raw_files(dir.path(), &DiscoveryConfig::default()).unwrap();
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
    }

    #[test]
    fn test_max_depth_1_skips_subdirs() {
        let dir = make_temp_tree();
        let config = DiscoveryConfig {
            max_depth: 1,
            ..Default::default()
        };
        let (files, _) = discover_raw_files(dir.path(), &config).unwrap();
        assert!(!names(&files).contains(&"c.raw".to_string()));
    }

    #[test]
    fn test_max_files_truncates_with_warning() {
        let dir = make_temp_tree();
        let config = DiscoveryConfig {
            max_files: 2,
            ..Default::default()
        };
        let (files, warnings) = discover_raw_files(dir.path(), &config).unwrap();
        assert_eq!(files.len(), 2);
        let text = warnings.join(" ");
        assert!(text.contains('3') && text.contains('2'), "got: {text}");
    }

    #[test]
    fn test_empty_include_list_takes_everything() {
        let dir = make_temp_tree();
        let config = DiscoveryConfig {
            include_patterns: Vec::new(),
            ..Default::default()
        };
        let (files, _) = discover_raw_files(dir.path(), &config).unwrap();
        assert_eq!(files.len(), 4);
    }

    #[test]
    fn test_root_not_found() {
        let result = discover_raw_files(
            Path::new("/nonexistent/path/rawsleuth"),
            &DiscoveryConfig::default(),
        );
        assert!(matches!(result, Err(DiscoveryError::RootNotFound { .. })));
    }

    #[test]
    fn test_root_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("single.raw");
        fs::write(&file, b"raw").unwrap();
        let result = discover_raw_files(&file, &DiscoveryConfig::default());
        assert!(matches!(result, Err(DiscoveryError::NotADirectory { .. })));
    }
}
