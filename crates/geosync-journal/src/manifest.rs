use chrono::{DateTime, Utc};
use geosync_core::{ChangeCounts, CoverageStats, RunId, Stage, StageStatus};
use geosync_resolver::ResolveSummary;
use serde::Serialize;

/// Outcome of one pipeline stage as recorded in the run manifest.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    pub detail: String,
    pub elapsed_ms: u64,
}

impl StageRecord {
    pub fn not_run(stage: Stage) -> Self {
        Self {
            stage,
            status: StageStatus::NotRun,
            detail: String::new(),
            elapsed_ms: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub current_digest: Option<String>,
    pub previous_digest: Option<String>,
    pub changes: Option<ChangeCounts>,
    pub resolve: Option<ResolveSummary>,
    pub coverage: Option<CoverageStats>,
    pub stages: Vec<StageRecord>,
    pub aborted_at: Option<Stage>,
}

impl RunManifest {
    pub fn new(run_id: RunId, dry_run: bool) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            current_digest: None,
            previous_digest: None,
            changes: None,
            resolve: None,
            coverage: None,
            stages: Vec::new(),
            aborted_at: None,
        }
    }
}
