// RawSleuth - platform/config.rs
//
// Platform-specific directory resolution and config.toml loading with
// startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for RawSleuth configuration and data.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/rawsleuth/ or %APPDATA%\RawSleuth\config\)
    pub config_dir: PathBuf,

    /// Data directory (provisioned tools live below it).
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be
    /// determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }

    /// Default bundle directory the tools are provisioned from.
    pub fn bundled_tools_dir(&self) -> PathBuf {
        self.data_dir.join(constants::TOOLS_DIR_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so a newer config file still works
/// with an older binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[tools]` section.
    pub tools: ToolsSection,
    /// `[exclusion]` section.
    pub exclusion: ExclusionSection,
    /// `[discovery]` section.
    pub discovery: DiscoverySection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[tools]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// Directory the extraction tools are run from.
    pub dir: Option<String>,
    /// Directory holding pristine copies used to provision `dir`.
    pub bundle_dir: Option<String>,
}

/// `[exclusion]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ExclusionSection {
    /// Exclusion TOML file replacing the built-in one.
    pub file: Option<String>,
}

/// `[discovery]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// Maximum directory recursion depth.
    pub max_depth: Option<usize>,
    /// Maximum raw files per batch.
    pub max_files: Option<usize>,
    /// Include glob patterns.
    pub include_patterns: Option<Vec<String>>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Tools --
    pub tool_dir: PathBuf,
    pub bundle_dir: Option<PathBuf>,

    // -- Exclusion --
    pub exclusion_file: Option<PathBuf>,

    // -- Discovery --
    pub max_depth: usize,
    pub max_files: usize,
    pub include_patterns: Vec<String>,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tool_dir: PathBuf::from(constants::DEFAULT_TOOL_DIR),
            bundle_dir: None,
            exclusion_file: None,
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_files: constants::DEFAULT_MAX_FILES,
            include_patterns: constants::DEFAULT_INCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            log_level: None,
        }
    }
}

/// Load and validate the config file at `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal
/// warnings. A missing file yields defaults with no warnings (first run). An
/// unreadable or unparsable file yields defaults and a warning: the run still
/// proceeds but the user is told why their settings were ignored.
///
/// Relative paths in the `[tools]` and `[exclusion]` sections are resolved
/// against the directory holding the config file.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let base_dir = config_path.parent().unwrap_or(Path::new("."));
    let (config, validation_warnings) = validate(raw, base_dir);
    warnings.extend(validation_warnings);

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Validate each field against named constants, accumulating all problems.
fn validate(raw: RawConfig, base_dir: &Path) -> (AppConfig, Vec<String>) {
    let mut config = AppConfig::default();
    let mut warnings = Vec::new();

    let resolve = |value: &str| -> PathBuf {
        let path = PathBuf::from(value);
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    };

    // -- Tools --
    if let Some(ref dir) = raw.tools.dir {
        if dir.trim().is_empty() {
            warnings.push(format!(
                "[tools] dir is empty. Using default ({}).",
                constants::DEFAULT_TOOL_DIR
            ));
        } else {
            config.tool_dir = resolve(dir);
        }
    }
    if let Some(ref dir) = raw.tools.bundle_dir {
        if !dir.trim().is_empty() {
            config.bundle_dir = Some(resolve(dir));
        }
    }

    // -- Exclusion --
    if let Some(ref file) = raw.exclusion.file {
        if !file.trim().is_empty() {
            config.exclusion_file = Some(resolve(file));
        }
    }

    // -- Discovery: max_depth --
    if let Some(depth) = raw.discovery.max_depth {
        if (1..=constants::ABSOLUTE_MAX_DEPTH).contains(&depth) {
            config.max_depth = depth;
        } else {
            warnings.push(format!(
                "[discovery] max_depth = {depth} is out of range (1-{}). Using default ({}).",
                constants::ABSOLUTE_MAX_DEPTH,
                constants::DEFAULT_MAX_DEPTH,
            ));
        }
    }

    // -- Discovery: max_files --
    if let Some(files) = raw.discovery.max_files {
        if (constants::MIN_MAX_FILES..=constants::ABSOLUTE_MAX_FILES).contains(&files) {
            config.max_files = files;
        } else {
            warnings.push(format!(
                "[discovery] max_files = {files} is out of range ({}-{}). Using default ({}).",
                constants::MIN_MAX_FILES,
                constants::ABSOLUTE_MAX_FILES,
                constants::DEFAULT_MAX_FILES,
            ));
        }
    }

    // -- Discovery: include_patterns --
    if let Some(patterns) = raw.discovery.include_patterns {
        if patterns.is_empty() {
            warnings.push(
                "[discovery] include_patterns is empty. Using default (*.raw).".to_string(),
            );
        } else {
            config.include_patterns = patterns;
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        if constants::VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: {}. Using default ({}).",
                constants::VALID_LOG_LEVELS.join(", "),
                constants::DEFAULT_LOG_LEVEL,
            ));
        }
    }

    (config, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(constants::CONFIG_FILE_NAME);
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(&dir.path().join("config.toml"));
        assert!(warnings.is_empty());
        assert_eq!(config.tool_dir, PathBuf::from(constants::DEFAULT_TOOL_DIR));
        assert_eq!(config.max_files, constants::DEFAULT_MAX_FILES);
        assert!(config.exclusion_file.is_none());
    }

    #[test]
    fn test_full_config() {
        let (dir, path) = write_config(
            r#"
[tools]
dir = "thermo-tools"
bundle_dir = "/opt/rawsleuth/tools"

[exclusion]
file = "exclusions.toml"

[discovery]
max_depth = 3
max_files = 20
include_patterns = ["*.raw", "*.RAW"]

[logging]
level = "DEBUG"
"#,
        );
        let (config, warnings) = load_config(&path);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(config.tool_dir, dir.path().join("thermo-tools"));
        assert_eq!(config.bundle_dir, Some(PathBuf::from("/opt/rawsleuth/tools")));
        assert_eq!(
            config.exclusion_file,
            Some(dir.path().join("exclusions.toml"))
        );
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_files, 20);
        assert_eq!(config.include_patterns.len(), 2);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_out_of_range_values_warn_and_default() {
        let (_dir, path) = write_config(
            "[discovery]\nmax_depth = 0\nmax_files = 1000000\n[logging]\nlevel = \"loud\"\n",
        );
        let (config, warnings) = load_config(&path);
        assert_eq!(warnings.len(), 3);
        assert_eq!(config.max_depth, constants::DEFAULT_MAX_DEPTH);
        assert_eq!(config.max_files, constants::DEFAULT_MAX_FILES);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_unparsable_file_warns() {
        let (_dir, path) = write_config("[discovery\nmax_depth = ");
        let (config, warnings) = load_config(&path);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Failed to parse"));
        assert_eq!(config.max_depth, constants::DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let (_dir, path) = write_config("[future]\nshiny = true\n[logging]\nlevel = \"warn\"\n");
        let (config, warnings) = load_config(&path);
        assert!(warnings.is_empty());
        assert_eq!(config.log_level.as_deref(), Some("warn"));
    }
}
