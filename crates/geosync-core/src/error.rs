use thiserror::Error;

use crate::ErrorKind;

/// Failures the pipeline distinguishes when deciding whether to continue.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unusable input: {0}")]
    FatalInput(String),
    #[error("{what} timed out after {secs}s")]
    ExternalTimeout { what: String, secs: u64 },
    #[error("external step failed: {0}")]
    ExternalFailure(String),
    #[error("missing required fields: {0}")]
    PreconditionSkip(String),
    #[error("housekeeping failed: {0}")]
    Housekeeping(String),
    #[error("service lifecycle: {0}")]
    Lifecycle(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::FatalInput(_) => ErrorKind::FatalInput,
            SyncError::ExternalTimeout { .. } => ErrorKind::ExternalTimeout,
            SyncError::ExternalFailure(_) => ErrorKind::ExternalFailure,
            SyncError::PreconditionSkip(_) => ErrorKind::PreconditionSkip,
            SyncError::Housekeeping(_) => ErrorKind::Housekeeping,
            SyncError::Lifecycle(_) => ErrorKind::Lifecycle,
        }
    }
}
