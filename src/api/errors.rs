use thiserror::Error;

use crate::exec::StepError;
use crate::registry::RegistryError;

/// Errors that surface from the facade before or outside plan execution.
/// Step-level failures never take this path; they become execution
/// records inside the run report.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    Configuration(#[from] RegistryError),
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("locking timeout: {0}")]
    LockingTimeout(String),
    #[error("backup area error: {0}")]
    Backup(String),
    #[error("unknown run id: {0}")]
    UnknownRun(String),
    #[error("log error: {0}")]
    Report(String),
}

impl ApiError {
    /// Process exit code contract: 2 for anything rejected before
    /// execution starts, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            ApiError::Configuration(_) | ApiError::Precondition(_) | ApiError::UnknownRun(_) => 2,
            _ => 1,
        }
    }
}

// Stable identifiers attached to facts so log consumers can route on
// failure category without parsing messages.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorId {
    E_TOOL_MISSING,
    E_TOOL_FAILED,
    E_PERMISSION,
    E_TIMEOUT,
    E_BACKUP,
    E_RESTORE_FAILED,
    E_RESTORE_CONFLICT,
    E_IRREVERSIBLE,
    E_LOCKING,
    E_GENERIC,
}

#[must_use]
pub const fn id_str(id: ErrorId) -> &'static str {
    match id {
        ErrorId::E_TOOL_MISSING => "E_TOOL_MISSING",
        ErrorId::E_TOOL_FAILED => "E_TOOL_FAILED",
        ErrorId::E_PERMISSION => "E_PERMISSION",
        ErrorId::E_TIMEOUT => "E_TIMEOUT",
        ErrorId::E_BACKUP => "E_BACKUP",
        ErrorId::E_RESTORE_FAILED => "E_RESTORE_FAILED",
        ErrorId::E_RESTORE_CONFLICT => "E_RESTORE_CONFLICT",
        ErrorId::E_IRREVERSIBLE => "E_IRREVERSIBLE",
        ErrorId::E_LOCKING => "E_LOCKING",
        ErrorId::E_GENERIC => "E_GENERIC",
    }
}

/// Classify a step execution failure for facts.
#[must_use]
pub(crate) const fn error_id_for_step(e: &StepError) -> ErrorId {
    match e {
        StepError::ToolMissing(_) => ErrorId::E_TOOL_MISSING,
        StepError::ToolFailed { .. } => ErrorId::E_TOOL_FAILED,
        StepError::PermissionDenied(_) => ErrorId::E_PERMISSION,
        StepError::Timeout { .. } => ErrorId::E_TIMEOUT,
        StepError::Io(_) => ErrorId::E_GENERIC,
    }
}
