use serde::{Deserialize, Serialize};

use crate::Stage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FatalInput,
    ExternalTimeout,
    ExternalFailure,
    PreconditionSkip,
    Housekeeping,
    Lifecycle,
}

/// What the orchestrator does after a stage reports an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Stop the run; nothing after this stage is committed.
    Abort,
    /// Record the failure and carry on.
    Continue,
    /// Carry on, but the operator must act by hand.
    Escalate,
}

/// Stage failure policy.
///
/// Transient failures are retried by the next scheduled run, never in place:
/// - acquire/diff/resolve failures abort before any rotation
/// - prune/stats/report/backup failures are best-effort housekeeping
/// - restart failures never undo the data update, they escalate
pub fn decide(stage: Stage, kind: ErrorKind) -> Disposition {
    match (stage, kind) {
        (_, ErrorKind::PreconditionSkip) => Disposition::Continue,
        (Stage::Restart, _) | (_, ErrorKind::Lifecycle) => Disposition::Escalate,
        (Stage::Acquire | Stage::Diff | Stage::Resolve, _) => Disposition::Abort,
        _ => Disposition::Continue,
    }
}
