// RawSleuth - util/logging.rs
//
// Structured logging for extraction runs.
//
// Activation:
//   - Environment variable: RUST_LOG (full EnvFilter syntax, used verbatim)
//   - CLI flag: --debug (debug for RawSleuth's own modules only)
//   - Config file: [logging] level = "debug" (same scope as --debug)
//
// Dependencies stay at the default level unless RUST_LOG says otherwise, so
// a debug run shows per-file and per-pass events without walkdir or rayon
// internals.
//
// Output: stderr. Standard output is reserved for the JSON graph snapshot.

use super::constants;
use tracing_subscriber::EnvFilter;

/// Target prefix of every event emitted by this crate.
const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Filter directive for the given settings.
///
/// Priority: RUST_LOG > --debug > config level > default.
pub fn filter_directive(
    rust_log: Option<&str>,
    debug_flag: bool,
    config_level: Option<&str>,
) -> String {
    if let Some(directive) = rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        return directive.to_string();
    }
    let crate_level = if debug_flag {
        "debug"
    } else {
        config_level.unwrap_or(constants::DEFAULT_LOG_LEVEL)
    };
    format!("{},{CRATE_TARGET}={crate_level}", constants::DEFAULT_LOG_LEVEL)
}

/// Initialise the logging subsystem.
///
/// `config_level` is the validated `[logging] level` from config.toml.
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(rust_log.as_deref(), debug_flag, config_level);
    let (filter, rejected) = match EnvFilter::try_new(&directive) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(constants::DEFAULT_LOG_LEVEL), Some(e.to_string())),
    };

    // A subscriber may already be installed (integration tests).
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .try_init()
        .is_ok();

    if let Some(error) = rejected {
        tracing::warn!(directive = %directive, error = %error, "Invalid log filter, using default");
    }
    tracing::debug!(
        app = constants::APP_NAME,
        version = constants::APP_VERSION,
        directive = %directive,
        installed,
        "Logging initialised"
    );
}
