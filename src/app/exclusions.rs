// RawSleuth - app/exclusions.rs
//
// Loads the exclusion specification: the built-in one embedded in the
// binary, or a user file that replaces it entirely.
//
// A user file that is named but missing or broken is fatal: silently
// falling back to the built-in list would record properties the user asked
// to drop.

use crate::core::exclusion::{self, ExclusionConfig};
use crate::core::model::PassKind;
use crate::util::error::ConfigError;
use std::path::Path;

/// Load the exclusion specification from `file`, or the built-in one.
pub fn load_exclusions(file: Option<&Path>) -> Result<ExclusionConfig, ConfigError> {
    let Some(path) = file else {
        tracing::debug!("Using built-in exclusions");
        return Ok(ExclusionConfig::builtin());
    };

    if !path.is_file() {
        tracing::error!(path = %path.display(), "Exclusion file does not exist");
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = exclusion::parse_exclusions(&content, path)?;

    for pass in [PassKind::StatusLog, PassKind::TuneMethod] {
        let spec = config.for_pass(pass);
        tracing::info!(
            path = %path.display(),
            pass = %pass,
            exact = spec.exact.len(),
            partial = spec.partial.len(),
            "Loaded exclusions"
        );
    }
    Ok(config)
}
