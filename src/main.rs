// RawSleuth - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation (debug mode support)
// 3. Exclusion loading and tool provisioning
// 4. Batch extraction and the JSON snapshot of the resulting entity graph

use clap::Parser;
use rawsleuth::app::batch::{self, BatchOutcome};
use rawsleuth::app::exclusions;
use rawsleuth::app::extract::{ExtractionRequest, Extractor};
use rawsleuth::core::discovery::DiscoveryConfig;
use rawsleuth::core::graph::EntityGraph;
use rawsleuth::platform::config::{self, PlatformPaths};
use rawsleuth::platform::process::ProcessRunner;
use rawsleuth::platform::tools::ToolSetup;
use rawsleuth::util::constants;
use rawsleuth::util::error::{ConfigError, RawSleuthError, Result};
use rawsleuth::util::logging;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// RawSleuth - instrument data extraction from Thermo raw files.
///
/// Runs the Thermo extraction tools on each raw file, summarises the
/// status log and tune method, and prints the resulting
/// instrument/run/property/value graph as JSON.
#[derive(Parser, Debug)]
#[command(name = "rawsleuth", version, about)]
struct Cli {
    /// Raw files or directories containing raw files.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Name of the instrument the runs belong to.
    #[arg(short = 'i', long = "instrument")]
    instrument: String,

    /// Run name (single raw file only; defaults to the file name).
    #[arg(short = 'r', long = "run-name")]
    run_name: Option<String>,

    /// Extra run metadata as NAME=VALUE (repeatable).
    #[arg(short = 'm', long = "meta", value_parser = parse_meta)]
    meta: Vec<(String, String)>,

    /// config.toml to use instead of the platform default.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Exclusion TOML file (overrides the config file and the built-in list).
    #[arg(short = 'x', long = "exclusions")]
    exclusions: Option<PathBuf>,

    /// Directory containing the extraction tools.
    #[arg(short = 't', long = "tool-dir")]
    tool_dir: Option<PathBuf>,

    /// Write the JSON snapshot here instead of stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn parse_meta(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() && !value.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE with both parts non-empty, got '{s}'")),
    }
}

/// A failed file as recorded in the snapshot.
#[derive(Debug, Serialize)]
struct FailureRecord {
    file: String,
    error: String,
}

/// JSON document written at the end of a run.
#[derive(Debug, Serialize)]
struct Snapshot<'a> {
    generator: &'static str,
    version: &'static str,
    graph: &'a EntityGraph,
    failures: Vec<FailureRecord>,
}

fn main() {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| platform_paths.config_file());
    let (app_config, config_warnings) = config::load_config(&config_path);

    logging::init(cli.debug, app_config.log_level.as_deref());
    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "RawSleuth starting"
    );
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    match run(&cli, app_config, &platform_paths) {
        Ok(outcome) if outcome.is_complete_success() => {}
        Ok(outcome) => {
            eprintln!(
                "{} of {} raw files could not be extracted",
                outcome.failures.len(),
                outcome.failures.len() + outcome.runs.len()
            );
            std::process::exit(2);
        }
        Err(e) => {
            tracing::error!(error = %e, "RawSleuth failed");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn run(
    cli: &Cli,
    app_config: config::AppConfig,
    platform_paths: &PlatformPaths,
) -> Result<BatchOutcome> {
    let exclusion_file = cli
        .exclusions
        .as_deref()
        .or(app_config.exclusion_file.as_deref());
    let exclusions = exclusions::load_exclusions(exclusion_file)?;

    let discovery = DiscoveryConfig {
        max_depth: app_config.max_depth,
        max_files: app_config.max_files,
        include_patterns: app_config.include_patterns.clone(),
    };
    let (files, discovery_warnings) = batch::collect_raw_files(&cli.paths, &discovery)?;
    for warning in &discovery_warnings {
        tracing::warn!(warning = %warning, "Discovery warning");
    }
    if files.is_empty() {
        tracing::warn!("No raw files found");
    }
    if cli.run_name.is_some() && files.len() > 1 {
        return Err(ConfigError::ValueOutOfRange {
            field: "--run-name".to_string(),
            value: format!("{} files", files.len()),
            expected: "exactly one raw file".to_string(),
        }
        .into());
    }

    let tool_dir = cli
        .tool_dir
        .clone()
        .unwrap_or_else(|| app_config.tool_dir.clone());
    let bundle_dir = app_config
        .bundle_dir
        .clone()
        .or_else(|| Some(platform_paths.bundled_tools_dir()).filter(|d| d.is_dir()));
    let setup = Arc::new(ToolSetup::new(&tool_dir, bundle_dir));
    let extractor = Extractor::new(Arc::new(ProcessRunner::new(&tool_dir)), exclusions)
        .with_setup(setup);

    let requests: Vec<ExtractionRequest> = files
        .iter()
        .map(|file| {
            let mut request = ExtractionRequest::new(file, cli.instrument.as_str());
            request.run_name = cli.run_name.clone();
            request.metadata = cli.meta.clone();
            request
        })
        .collect();

    let outcome = batch::extract_batch(&extractor, &requests);
    for (file, error) in &outcome.failures {
        eprintln!("{}: {error}", file.display());
    }
    write_snapshot(&outcome, cli.output.as_ref())?;
    Ok(outcome)
}

fn write_snapshot(outcome: &BatchOutcome, output: Option<&PathBuf>) -> Result<()> {
    let snapshot = Snapshot {
        generator: constants::APP_NAME,
        version: constants::APP_VERSION,
        graph: &outcome.graph,
        failures: outcome
            .failures
            .iter()
            .map(|(file, error)| FailureRecord {
                file: file.display().to_string(),
                error: error.to_string(),
            })
            .collect(),
    };

    let (mut writer, target): (Box<dyn Write>, PathBuf) = match output {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|source| RawSleuthError::Io {
                path: path.clone(),
                operation: "create snapshot",
                source,
            })?;
            (Box::new(std::io::BufWriter::new(file)), path.clone())
        }
        None => (
            Box::new(std::io::BufWriter::new(std::io::stdout().lock())),
            PathBuf::from("<stdout>"),
        ),
    };

    let io_err = |source: std::io::Error| RawSleuthError::Io {
        path: target.clone(),
        operation: "write snapshot",
        source,
    };
    serde_json::to_writer_pretty(&mut writer, &snapshot).map_err(|e| io_err(e.into()))?;
    writeln!(writer).map_err(io_err)?;
    writer.flush().map_err(io_err)?;

    tracing::info!(path = %target.display(), "Snapshot written");
    Ok(())
}
