// RawSleuth - platform/process.rs
//
// Runs the external extraction tools.
//
// A tool is invoked with the absolute raw file path as its only argument.
// Its standard output is drained completely and returned as text; stderr is
// drained on a helper thread so a chatty tool can never block on a full
// pipe. The call blocks until the process has exited. There is no timeout.

use crate::util::constants;
use crate::util::error::ToolFailure;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Source of tool output for one raw file.
///
/// `ProcessRunner` spawns the real executables; tests substitute canned
/// output.
pub trait ToolRunner: Send + Sync {
    /// Run `tool` against `raw_file` and return its complete standard output.
    fn run(&self, tool: &'static str, raw_file: &Path) -> Result<String, ToolFailure>;
}

/// Runs the tools as child processes from a tool directory.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    tool_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(tool_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool_dir: tool_dir.into(),
        }
    }

    pub fn tool_dir(&self) -> &Path {
        &self.tool_dir
    }

    pub fn tool_path(&self, tool: &str) -> PathBuf {
        self.tool_dir.join(tool)
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, tool: &'static str, raw_file: &Path) -> Result<String, ToolFailure> {
        let program = self.tool_path(tool);
        tracing::debug!(
            tool = %program.display(),
            file = %raw_file.display(),
            "Starting extraction tool"
        );

        let mut child = Command::new(&program)
            .arg(raw_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ToolFailure::Spawn)?;

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                // Best effort: stderr only decorates the error message.
                let _ = stderr.read_to_end(&mut buf);
                buf
            })
        });

        let mut stdout_bytes = Vec::new();
        let read_result = match child.stdout.take() {
            Some(mut stdout) => stdout.read_to_end(&mut stdout_bytes).map(|_| ()),
            None => Ok(()),
        };

        // Always reap the child, even when reading failed.
        let status = child.wait().map_err(ToolFailure::Wait)?;
        let stderr_bytes = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        read_result.map_err(ToolFailure::Read)?;

        if !status.success() {
            let stderr = stderr_preview(&stderr_bytes);
            tracing::warn!(
                tool,
                file = %raw_file.display(),
                code = ?status.code(),
                stderr = %stderr,
                "Extraction tool failed"
            );
            return Err(ToolFailure::ExitStatus {
                code: status.code(),
                stderr,
            });
        }

        tracing::debug!(
            tool,
            file = %raw_file.display(),
            bytes = stdout_bytes.len(),
            "Extraction tool finished"
        );

        // Tool output is not guaranteed to be UTF-8; undecodable bytes are
        // replaced and later mapped to '?' by the line dialects.
        Ok(String::from_utf8_lossy(&stdout_bytes).into_owned())
    }
}

/// Trimmed, length-limited stderr text for error messages.
fn stderr_preview(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.len() <= constants::MAX_TOOL_STDERR_PREVIEW {
        return text.to_string();
    }
    let mut end = constants::MAX_TOOL_STDERR_PREVIEW;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
