// RawSleuth - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation: every variant names the subsystem and
// keeps the underlying cause reachable through `source()`.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all RawSleuth operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum RawSleuthError {
    /// Extraction of a raw file failed.
    Extraction(ExtractionError),

    /// Entity graph contract violation.
    Graph(GraphError),

    /// Raw file discovery failed.
    Discovery(DiscoveryError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for RawSleuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction(e) => write!(f, "Extraction error: {e}"),
            Self::Graph(e) => write!(f, "Entity graph error: {e}"),
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for RawSleuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Extraction(e) => Some(e),
            Self::Graph(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction errors
// ---------------------------------------------------------------------------

/// Why an external tool invocation failed.
#[derive(Debug)]
pub enum ToolFailure {
    /// The process could not be started.
    Spawn(io::Error),

    /// Reading the process output failed.
    Read(io::Error),

    /// Waiting for the process to terminate failed.
    Wait(io::Error),

    /// The process terminated with a non-zero status.
    /// `code` is `None` when the process was killed by a signal.
    ExitStatus { code: Option<i32>, stderr: String },
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "could not start process: {e}"),
            Self::Read(e) => write!(f, "could not read process output: {e}"),
            Self::Wait(e) => write!(f, "could not wait for process: {e}"),
            Self::ExitStatus { code, stderr } => {
                match code {
                    Some(c) => write!(f, "process exited with status {c}")?,
                    None => write!(f, "process terminated by signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, " ({stderr})")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ToolFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(e) | Self::Read(e) | Self::Wait(e) => Some(e),
            Self::ExitStatus { .. } => None,
        }
    }
}

/// Errors raised while extracting instrument data from one raw file.
#[derive(Debug)]
pub enum ExtractionError {
    /// The raw file path is not acceptable (wrong extension, missing file).
    InvalidRawFile { path: PathBuf, reason: String },

    /// The sample date or instrument model could not be read. Fatal for the
    /// whole file: no run is produced.
    MetadataExtractionFailed { file: PathBuf, reason: String },

    /// An external tool failed while producing one pass.
    ExtractionProcessFailed {
        file: PathBuf,
        tool: &'static str,
        failure: ToolFailure,
    },

    /// Both passes failed; both causes are kept.
    BothPassesFailed {
        status_log: Box<ExtractionError>,
        tune_method: Box<ExtractionError>,
    },

    /// Provisioning the tool executables failed.
    ToolSetup { path: PathBuf, source: io::Error },

    /// Building the entity graph violated a contract.
    Graph(GraphError),
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRawFile { path, reason } => {
                write!(f, "Invalid raw file '{}': {reason}", path.display())
            }
            Self::MetadataExtractionFailed { file, reason } => write!(
                f,
                "Metadata extraction failed for '{}': {reason}",
                file.display()
            ),
            Self::ExtractionProcessFailed {
                file,
                tool,
                failure,
            } => write!(f, "'{tool}' failed on '{}': {failure}", file.display()),
            Self::BothPassesFailed {
                status_log,
                tune_method,
            } => write!(
                f,
                "Both passes failed. Status log: {status_log}. Tune method: {tune_method}"
            ),
            Self::ToolSetup { path, source } => {
                write!(f, "Tool setup failed at '{}': {source}", path.display())
            }
            Self::Graph(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ExtractionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ExtractionProcessFailed { failure, .. } => Some(failure),
            Self::BothPassesFailed { status_log, .. } => Some(status_log.as_ref()),
            Self::ToolSetup { source, .. } => Some(source),
            Self::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GraphError> for ExtractionError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<ExtractionError> for RawSleuthError {
    fn from(e: ExtractionError) -> Self {
        Self::Extraction(e)
    }
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

/// Contract violations while constructing entities. These indicate a bug in
/// the caller, not a data problem, and are never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An id does not refer to an entity of this graph.
    InvalidReference { entity: &'static str, id: usize },

    /// A mandatory field is empty or otherwise unacceptable.
    InvalidArgument { field: &'static str, reason: String },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidReference { entity, id } => {
                write!(f, "{entity} #{id} does not exist in this graph")
            }
            Self::InvalidArgument { field, reason } => {
                write!(f, "Invalid {field}: {reason}")
            }
        }
    }
}

impl std::error::Error for GraphError {}

impl From<GraphError> for RawSleuthError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to raw file discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The root scan path does not exist or is not accessible.
    RootNotFound { path: PathBuf },

    /// The root path is not a directory.
    NotADirectory { path: PathBuf },

    /// Walkdir traversal error on the root itself.
    Traversal {
        path: PathBuf,
        source: walkdir::Error,
    },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Scan path '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Scan path '{}' is not a directory", path.display())
            }
            Self::Traversal { path, source } => {
                write!(f, "Error traversing '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Traversal { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for RawSleuthError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration and exclusion file loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A file named explicitly by the user does not exist.
    NotFound { path: PathBuf },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading a config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::NotFound { path } => {
                write!(f, "Config file '{}' does not exist", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for RawSleuthError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for RawSleuth results.
pub type Result<T> = std::result::Result<T, RawSleuthError>;
