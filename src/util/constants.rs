// RawSleuth - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Wire-format tokens of the external extraction tools live here too, so a
// tool-output change touches exactly one file.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "RawSleuth";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "RawSleuth";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Tool output grammar
// =============================================================================

/// Lines starting with this token close the current section.
pub const END_OF_SECTION_SENTINEL: &str = "--END_OF_";

/// Field delimiter in every tool output line.
pub const FIELD_DELIMITER: char = '\t';

/// Q Exactive section headers are wrapped in this marker.
pub const QEXACTIVE_HEADER_MARKER: &str = "===";

/// Joiner between a section and an observation name (property names,
/// exact exclusion entries, merged TSQ Vantage headers).
pub const SECTION_JOINER: &str = " - ";

/// Replacement for non-ASCII characters in headers and observation names.
pub const NON_ASCII_REPLACEMENT: char = '?';

/// chrono pattern for the sample date, without the trailing zone token.
/// Example input: "2020-Jan-01 10:00:00 UTC".
pub const SAMPLE_DATE_FORMAT: &str = "%Y-%b-%d %H:%M:%S";

// =============================================================================
// External tools
// =============================================================================

/// Tool printing the sample date and instrument model of a raw file.
pub const METADATA_TOOL: &str = "ThermoMetaData.exe";

/// Tool printing the status log of a raw file.
pub const STATUS_LOG_TOOL: &str = "ThermoStatusLog.exe";

/// Tool printing the tune method of a raw file.
pub const TUNE_METHOD_TOOL: &str = "ThermoTuneMethod.exe";

/// Default tool directory, relative to the working directory.
pub const DEFAULT_TOOL_DIR: &str = "Thermo";

/// Raw file extension accepted by the extractor (compared case-insensitively).
pub const RAW_FILE_EXTENSION: &str = "raw";

// =============================================================================
// Property types
// =============================================================================

/// Property type tag for status-log values.
pub const STATUS_LOG_TYPE: &str = "statuslog";

/// Property type tag for tune-method values.
pub const TUNE_METHOD_TYPE: &str = "tunemethod";

// =============================================================================
// Controlled vocabularies
// =============================================================================

pub const CV_IMON_LABEL: &str = "iMonDB";
pub const CV_IMON_NAME: &str = "Dummy controlled vocabulary containing iMonDB terms";
pub const CV_IMON_URI: &str = "https://bitbucket.org/proteinspector/jmondb/";
pub const CV_IMON_VERSION: &str = "0.0.1";

pub const CV_MS_LABEL: &str = "MS";
pub const CV_MS_NAME: &str = "PSI-MS CV";
pub const CV_MS_URI: &str =
    "http://psidev.cvs.sourceforge.net/viewvc/psidev/psi/psi-ms/mzML/controlledVocabulary/psi-ms.obo";
pub const CV_MS_VERSION: &str = "3.68.0";

// =============================================================================
// Discovery limits
// =============================================================================

/// Maximum directory recursion depth during raw file discovery.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Hard upper bound on max depth (prevents runaway traversal).
pub const ABSOLUTE_MAX_DEPTH: usize = 50;

/// Maximum number of raw files to discover in a single scan.
pub const DEFAULT_MAX_FILES: usize = 5_000;

/// Minimum sensible value for the max-files limit.
pub const MIN_MAX_FILES: usize = 1;

/// Hard upper bound on max files (prevents configuration mistakes).
pub const ABSOLUTE_MAX_FILES: usize = 100_000;

/// Default include glob patterns for raw file discovery (case-insensitive).
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["*.raw"];

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Accepted values for `[logging] level`.
pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Maximum number of stderr bytes from a failed tool kept in the error.
pub const MAX_TOOL_STDERR_PREVIEW: usize = 512;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Subdirectory of the data directory holding provisioned tools.
pub const TOOLS_DIR_NAME: &str = "tools";
