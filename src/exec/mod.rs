//! Step execution: the narrow seam through which all external tools are
//! invoked, plus atomic config-file writes and probe evaluation.
//!
//! Failure modes are surfaced distinctly (`ToolMissing`, `ToolFailed`,
//! `PermissionDenied`, `Timeout`) and never swallowed; the runner turns
//! them into recorded step outcomes.

mod fswrite;
mod probe;
mod runner;

pub use fswrite::write_file_atomic;
pub use probe::evaluate_probe;
pub use runner::{CommandRunner, SystemRunner};

use std::time::Duration;

use thiserror::Error;

use crate::constants::OUTPUT_TAIL_MAX;
use crate::types::step::{CommandSpec, ServiceOp, StepAction};

/// Captured result of a finished external command.
#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("tool not found: {0}")]
    ToolMissing(String),
    #[error("{spec} exited with status {status}")]
    ToolFailed {
        spec: String,
        status: i32,
        stderr_tail: String,
    },
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("{spec} timed out after {timeout_ms} ms")]
    Timeout { spec: String, timeout_ms: u64 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render a service-manager operation as a command invocation.
pub fn service_command(unit: &str, op: ServiceOp) -> CommandSpec {
    match op {
        ServiceOp::Enable => CommandSpec::new("systemctl", &["enable", "--now", unit]),
        ServiceOp::Restart => CommandSpec::new("systemctl", &["restart", unit]),
    }
}

/// Last `OUTPUT_TAIL_MAX` bytes of captured output, for facts.
pub fn output_tail(s: &str) -> String {
    if s.len() <= OUTPUT_TAIL_MAX {
        return s.to_string();
    }
    let cut = s.len() - OUTPUT_TAIL_MAX;
    // Do not split a UTF-8 sequence.
    let mut start = cut;
    while start < s.len() && !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

/// Executes one step action exactly once per invocation.
pub struct StepExecutor<'a> {
    runner: &'a dyn CommandRunner,
    timeout: Option<Duration>,
}

impl<'a> StepExecutor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, timeout: Option<Duration>) -> Self {
        Self { runner, timeout }
    }

    /// Perform the mutating action. Command-shaped actions return the
    /// tool's captured output; file writes return `None`.
    pub fn apply(&self, action: &StepAction) -> Result<Option<CommandOutput>, StepError> {
        match action {
            StepAction::Command(spec) => self.run_checked(spec),
            StepAction::Service { unit, op } => self.run_checked(&service_command(unit, *op)),
            StepAction::WriteFile { path, contents, mode } => {
                write_file_atomic(path, contents.as_bytes(), *mode).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        StepError::PermissionDenied(path.display().to_string())
                    } else {
                        StepError::Io(e)
                    }
                })?;
                Ok(None)
            }
        }
    }

    fn run_checked(&self, spec: &CommandSpec) -> Result<Option<CommandOutput>, StepError> {
        let out = self.runner.run(spec, self.timeout)?;
        if out.success() {
            Ok(Some(out))
        } else {
            Err(StepError::ToolFailed {
                spec: spec.to_string(),
                status: out.status,
                stderr_tail: output_tail(&out.stderr),
            })
        }
    }
}
