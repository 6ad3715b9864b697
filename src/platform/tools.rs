// RawSleuth - platform/tools.rs
//
// Provisioning of the extraction tool directory.
//
// The three tools (plus any support files shipped next to them) are copied
// from a bundle directory into the tool directory the first time an
// extraction needs them. The copy runs at most once per `ToolSetup` and is
// serialised by the setup's own mutex, so extractions sharing the setup
// through an `Arc` never race on half-written executables.

use crate::util::constants;
use crate::util::error::ExtractionError;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Executables every extraction needs.
pub const REQUIRED_TOOLS: [&str; 3] = [
    constants::METADATA_TOOL,
    constants::STATUS_LOG_TOOL,
    constants::TUNE_METHOD_TOOL,
];

#[derive(Debug, Default)]
struct SetupState {
    ready: bool,
    /// Files this setup copied into the tool directory.
    copied: Vec<PathBuf>,
}

/// Once-only provisioning of a tool directory.
#[derive(Debug)]
pub struct ToolSetup {
    tool_dir: PathBuf,
    bundle_dir: Option<PathBuf>,
    state: Mutex<SetupState>,
}

impl ToolSetup {
    /// `bundle_dir` is where pristine tool copies live; `None` means the tool
    /// directory must already be complete.
    pub fn new(tool_dir: impl Into<PathBuf>, bundle_dir: Option<PathBuf>) -> Self {
        Self {
            tool_dir: tool_dir.into(),
            bundle_dir,
            state: Mutex::new(SetupState::default()),
        }
    }

    pub fn tool_dir(&self) -> &Path {
        &self.tool_dir
    }

    fn lock(&self) -> MutexGuard<'_, SetupState> {
        // The state is only a flag and a file list; a panic elsewhere
        // leaves it usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn missing_tools(&self) -> Vec<&'static str> {
        REQUIRED_TOOLS
            .iter()
            .copied()
            .filter(|tool| !self.tool_dir.join(tool).is_file())
            .collect()
    }

    /// Make sure every required tool exists in the tool directory, copying
    /// the bundle over if any is missing.
    pub fn ensure_ready(&self) -> Result<(), ExtractionError> {
        let mut state = self.lock();
        if state.ready {
            return Ok(());
        }

        let missing = self.missing_tools();
        if missing.is_empty() {
            tracing::debug!(dir = %self.tool_dir.display(), "Extraction tools present");
            state.ready = true;
            return Ok(());
        }

        let Some(bundle_dir) = self.bundle_dir.as_deref() else {
            return Err(missing_tool_error(&self.tool_dir, missing[0], "no bundle directory is configured"));
        };

        tracing::info!(
            from = %bundle_dir.display(),
            to = %self.tool_dir.display(),
            missing = ?missing,
            "Provisioning extraction tools"
        );
        let copied = copy_missing_files(bundle_dir, &self.tool_dir)?;
        state.copied.extend(copied);

        if let Some(tool) = self.missing_tools().first() {
            return Err(missing_tool_error(&self.tool_dir, tool, "not found in the bundle directory"));
        }

        state.ready = true;
        Ok(())
    }

    /// Remove the files this setup copied and forget the ready state.
    ///
    /// Files that were already present before provisioning are left alone.
    pub fn teardown(&self) -> Result<(), ExtractionError> {
        let mut state = self.lock();
        for path in state.copied.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(ExtractionError::ToolSetup { path, source }),
            }
        }
        // Only succeeds when nothing else lives there.
        let _ = std::fs::remove_dir(&self.tool_dir);
        state.ready = false;
        tracing::debug!(dir = %self.tool_dir.display(), "Extraction tools removed");
        Ok(())
    }
}

fn missing_tool_error(tool_dir: &Path, tool: &str, reason: &str) -> ExtractionError {
    ExtractionError::ToolSetup {
        path: tool_dir.join(tool),
        source: io::Error::new(io::ErrorKind::NotFound, format!("{tool} is missing and {reason}")),
    }
}

/// Copy every regular file of `from` that does not exist in `to`.
fn copy_missing_files(from: &Path, to: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let setup_err = |path: &Path, source: io::Error| ExtractionError::ToolSetup {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(to).map_err(|e| setup_err(to, e))?;
    let entries = std::fs::read_dir(from).map_err(|e| setup_err(from, e))?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| setup_err(from, e))?;
        let source = entry.path();
        if !source.is_file() {
            continue;
        }
        let target = to.join(entry.file_name());
        if target.exists() {
            continue;
        }
        std::fs::copy(&source, &target).map_err(|e| setup_err(&target, e))?;
        tracing::debug!(file = %target.display(), "Tool file copied");
        copied.push(target);
    }
    Ok(copied)
}
