use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use chrono::{Local, Utc};
use geosync_cache::{CacheError, ResolutionCache};
use geosync_core::{
    coverage, decide, diff_snapshots, plan_backfill, plan_resolution, ChangeCounts, ChangeSet, CoverageStats,
    Disposition, ErrorKind, RunId, Snapshot, Stage, StageStatus, SyncError,
};
use geosync_journal::{
    format_operator_notice, render_report, status_label, write_atomic, FsRunJournal, ReportInput, RunJournal,
    RunManifest, StageRecord,
};
use geosync_lifecycle::{
    LifecycleController, LifecycleError, ProcessTable, RestartOutcome, StartedService, StopOutcome,
    SysinfoProcessTable,
};
use geosync_resolver::{Geocoder, NominatimGeocoder, ResolveSummary, Resolver};
use geosync_snapshot::SnapshotStore;
use tracing::{error, info, warn};

use crate::{
    doctor::{doctor, Check},
    util::run_with_timeout,
    Config,
};

#[derive(Clone, Debug, Default)]
pub struct SyncOptions {
    pub skip_acquire: bool,
    pub no_restart: bool,
    /// Compute and report, but change nothing on disk outside the run journal.
    pub dry_run: bool,
}

/// Outcome of one `sync`. Every stage appears exactly once in `stages`.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: RunId,
    pub run_dir: Option<PathBuf>,
    pub stages: Vec<StageRecord>,
    pub aborted_at: Option<Stage>,
    /// Set when the data update committed but the operator has to act.
    pub manual_action: Option<String>,
    pub changes: Option<ChangeCounts>,
    pub resolve: Option<ResolveSummary>,
    pub coverage: Option<CoverageStats>,
    pub started: Option<StartedService>,
}

impl RunSummary {
    /// 0 done, 1 aborted before commit, 2 committed but restart needs a human.
    pub fn exit_code(&self) -> i32 {
        if self.aborted_at.is_some() {
            1
        } else if self.manual_action.is_some() {
            2
        } else {
            0
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(stage) = self.aborted_at {
            let detail = self.stage(stage).map(|s| s.detail.as_str()).unwrap_or("");
            parts.push(format!("aborted at {stage}: {detail}"));
        }
        if let Some(r) = &self.resolve {
            parts.push(format!("geocoded {}/{}", r.geocoded, r.attempted()));
        }
        if let Some(c) = &self.coverage {
            parts.push(format!("coverage {:.1}%", c.coverage_pct()));
        }
        let degraded = self
            .stages
            .iter()
            .filter(|s| s.status == StageStatus::Degraded)
            .count();
        if degraded > 0 {
            parts.push(format!("{degraded} degraded stage(s)"));
        }
        if self.manual_action.is_some() {
            parts.push("restart needs manual action".into());
        }
        if parts.is_empty() {
            parts.push("ok".into());
        }
        f.write_str(&parts.join(", "))
    }
}

struct Done {
    status: StageStatus,
    detail: String,
}

impl Done {
    fn pass(detail: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Pass,
            detail: detail.into(),
        }
    }

    fn skipped(detail: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skipped,
            detail: detail.into(),
        }
    }
}

type StageResult = std::result::Result<Done, SyncError>;

/// Values handed from one stage to the next within a single sync.
#[derive(Default)]
struct SyncState {
    current: Option<Snapshot>,
    previous: Option<Snapshot>,
    changes: Option<ChangeSet>,
    cache: Option<ResolutionCache>,
    resolve: Option<ResolveSummary>,
    coverage: Option<CoverageStats>,
    restarted: Option<RestartOutcome>,
}

/// Recover the taxonomy from an `anyhow` chain, or classify with `fallback`.
fn as_sync(err: anyhow::Error, fallback: fn(String) -> SyncError) -> SyncError {
    match err.downcast::<SyncError>() {
        Ok(e) => e,
        Err(other) => fallback(format!("{other:#}")),
    }
}

pub struct Runner {
    pub root: PathBuf,
    pub cfg: Config,
    pub store: Box<dyn SnapshotStore>,
    pub geocoder: Box<dyn Geocoder>,
    pub lifecycle: LifecycleController<Box<dyn ProcessTable>>,
    pub journal: Box<dyn RunJournal>,
}

impl Runner {
    pub fn open(root: PathBuf) -> Result<Self> {
        let cfg = Config::load_or_default(&root)?;
        let geocoder = NominatimGeocoder::new(cfg.nominatim_settings()).map_err(|e| anyhow!("resolution client: {e}"))?;
        let store = cfg.snapshot_store(&root);
        let journal = FsRunJournal::new(cfg.runs_dir(&root));
        Ok(Self::with_parts(
            root,
            cfg,
            Box::new(store),
            Box::new(geocoder),
            Box::new(SysinfoProcessTable::new()),
            Box::new(journal),
        ))
    }

    pub fn with_parts(
        root: PathBuf,
        cfg: Config,
        store: Box<dyn SnapshotStore>,
        geocoder: Box<dyn Geocoder>,
        processes: Box<dyn ProcessTable>,
        journal: Box<dyn RunJournal>,
    ) -> Self {
        let lifecycle = LifecycleController::new(processes, cfg.service_spec(&root));
        Self {
            root,
            cfg,
            store,
            geocoder,
            lifecycle,
            journal,
        }
    }

    /// Write a default `geosync.toml` (if absent) and create the working directories.
    pub fn init_root(root: &Path) -> Result<PathBuf> {
        let cfg_path = Config::config_path(root);
        let cfg = if cfg_path.exists() {
            Config::load_from(&cfg_path)?
        } else {
            let cfg = Config::default_for_root();
            cfg.save_to(&cfg_path)?;
            cfg
        };
        for dir in [cfg.data_dir(root), cfg.logs_dir(root), cfg.runs_dir(root)] {
            std::fs::create_dir_all(&dir).map_err(|e| anyhow!("create {}: {e}", dir.display()))?;
        }
        Ok(cfg_path)
    }

    pub fn doctor(&self) -> Vec<Check> {
        doctor(&self.root, &self.cfg)
    }

    fn load_cache(&self) -> std::result::Result<ResolutionCache, CacheError> {
        ResolutionCache::load(&self.cfg.cache_path(&self.root))
    }

    /// Change set between the stored current and previous snapshots.
    pub fn diff(&self) -> Result<(Snapshot, ChangeSet)> {
        let current = self.store.load_current()?;
        let previous = self.store.load_previous()?;
        let changes = diff_snapshots(&current, &previous);
        Ok((current, changes))
    }

    pub fn stats(&self) -> Result<CoverageStats> {
        let current = self.store.load_current()?;
        let cache = self.load_cache()?;
        Ok(coverage(&current, |id| cache.contains(id)))
    }

    /// Resolve every current record missing from the cache, up to `limit`.
    pub fn resolve_all(&self, limit: Option<usize>) -> Result<ResolveSummary> {
        let current = self.store.load_current()?;
        let mut cache = self.load_cache()?;
        let mut queue = plan_backfill(&current, |id| cache.contains(id));
        if let Some(limit) = limit {
            queue.truncate(limit);
        }
        let resolver = Resolver::new(&*self.geocoder, self.cfg.resolver_config(None));
        let summary = resolver.run(&queue, &current, &mut cache).map_err(SyncError::from)?;
        Ok(summary)
    }

    pub fn restart(&self) -> std::result::Result<RestartOutcome, LifecycleError> {
        self.lifecycle.restart()
    }

    /// Run every stage in order. Only stage failures the policy treats as
    /// fatal stop the run; they are reported in the summary, not as `Err`.
    pub fn sync(&self, opts: &SyncOptions) -> RunSummary {
        let run_id = RunId::new();
        let run_dir = match self.journal.create_run_dir(&run_id) {
            Ok(dir) => Some(dir),
            Err(e) => {
                warn!(error = %e, "run journal unavailable; continuing without it");
                None
            }
        };
        let mut manifest = RunManifest::new(run_id.clone(), opts.dry_run);
        let mut summary = RunSummary {
            run_id: run_id.clone(),
            run_dir: run_dir.clone(),
            stages: Vec::new(),
            aborted_at: None,
            manual_action: None,
            changes: None,
            resolve: None,
            coverage: None,
            started: None,
        };
        self.worklog(run_dir.as_deref(), &format!("## Run {run_id}{}", if opts.dry_run { " (dry run)" } else { "" }));
        info!(run_id = %run_id, dry_run = opts.dry_run, "sync started");

        let mut st = SyncState::default();
        for stage in Stage::ALL {
            let started = Instant::now();
            let result = match stage {
                Stage::Acquire => self.acquire(opts),
                Stage::Diff => self.diff_stage(&mut st),
                Stage::Resolve => self.resolve_stage(opts, &mut st),
                Stage::Prune => self.prune_stage(opts, &mut st),
                Stage::Stats => self.stats_stage(&mut st),
                Stage::Report => self.report_stage(opts, &st, &summary.stages, run_dir.as_deref()),
                Stage::Backup => self.backup_stage(opts),
                Stage::Restart => self.restart_stage(opts, &mut st),
            };
            let disposition = self.record(&mut summary, run_dir.as_deref(), stage, result, started.elapsed());
            if disposition == Disposition::Abort {
                summary.aborted_at = Some(stage);
                break;
            }
        }
        for stage in Stage::ALL {
            if summary.stage(stage).is_none() {
                summary.stages.push(StageRecord::not_run(stage));
            }
        }

        summary.changes = st.changes.as_ref().map(|c| c.counts());
        summary.resolve = st.resolve;
        summary.coverage = st.coverage;
        summary.started = st.restarted.map(|r| r.started);

        manifest.finished_at = Some(Utc::now());
        manifest.current_digest = st.current.as_ref().and_then(|s| s.digest.clone());
        manifest.previous_digest = st.previous.as_ref().and_then(|s| s.digest.clone());
        manifest.changes = summary.changes;
        manifest.resolve = summary.resolve.clone();
        manifest.coverage = summary.coverage.clone();
        manifest.stages = summary.stages.clone();
        manifest.aborted_at = summary.aborted_at;
        if let Some(dir) = run_dir.as_deref() {
            if let Err(e) = self.journal.write_manifest(dir, &manifest) {
                warn!(error = %e, "could not write run manifest");
            }
        }
        self.worklog(run_dir.as_deref(), &format!("\n**Outcome:** {summary}"));
        info!(run_id = %run_id, outcome = %summary, "sync finished");
        summary
    }

    fn record(
        &self,
        summary: &mut RunSummary,
        run_dir: Option<&Path>,
        stage: Stage,
        result: StageResult,
        elapsed: Duration,
    ) -> Disposition {
        let (status, detail, disposition) = match result {
            Ok(done) => (done.status, done.detail, Disposition::Continue),
            Err(e) => {
                let disposition = decide(stage, e.kind());
                let status = match (disposition, e.kind()) {
                    (_, ErrorKind::PreconditionSkip) => StageStatus::Skipped,
                    (Disposition::Abort, _) => StageStatus::Fail,
                    _ => StageStatus::Degraded,
                };
                match disposition {
                    Disposition::Abort => error!(%stage, error = %e, "stage failed; aborting run"),
                    _ => warn!(%stage, error = %e, "stage failed; continuing"),
                }
                (status, e.to_string(), disposition)
            }
        };

        println!("[{stage}] {} {detail}", status_label(&status));
        self.worklog(run_dir, &format!("- {stage}: {} {detail}", status_label(&status)));

        if disposition == Disposition::Escalate {
            summary.manual_action = Some(detail.clone());
            if let Some(dir) = run_dir {
                let start = self.cfg.service.start.join(" ");
                let logs = self.cfg.logs_dir(&self.root);
                let steps = [
                    format!("Check the newest service log in {}", logs.display()),
                    format!("Start the service by hand: `{start}`"),
                ];
                let steps: Vec<&str> = steps.iter().map(String::as_str).collect();
                let notice = format_operator_notice(&summary.run_id, &format!("{stage} did not complete"), &steps, Some(detail.as_str()));
                if let Err(e) = self.journal.write_notice(dir, &notice) {
                    warn!(error = %e, "could not write operator notice");
                }
            }
        }

        summary.stages.push(StageRecord {
            stage,
            status,
            detail,
            elapsed_ms: elapsed.as_millis() as u64,
        });
        disposition
    }

    fn worklog(&self, run_dir: Option<&Path>, line: &str) {
        if let Some(dir) = run_dir {
            if let Err(e) = self.journal.append_worklog(dir, line) {
                warn!(error = %e, "could not append to worklog");
            }
        }
    }

    fn acquire(&self, opts: &SyncOptions) -> StageResult {
        if opts.skip_acquire {
            return Ok(Done::skipped("--skip-acquire"));
        }
        let argv = &self.cfg.producer.command;
        if argv.is_empty() {
            return Ok(Done::skipped("no producer configured"));
        }
        if opts.dry_run {
            return Ok(Done::skipped(format!("dry run: would run `{}`", argv.join(" "))));
        }
        let log = self
            .cfg
            .logs_dir(&self.root)
            .join(format!("producer_{}.log", Local::now().format("%Y%m%d_%H%M%S")));
        run_with_timeout(
            argv,
            &self.cfg.producer_workdir(&self.root),
            Duration::from_secs(self.cfg.producer.timeout_secs),
            &log,
        )?;
        if !self.store.has_current() {
            return Err(SyncError::FatalInput("producer succeeded but left no current snapshot".into()));
        }
        Ok(Done::pass(format!("snapshot refreshed (log {})", log.display())))
    }

    fn diff_stage(&self, st: &mut SyncState) -> StageResult {
        let current = self.store.load_current().map_err(|e| as_sync(e, SyncError::FatalInput))?;
        let previous = self.store.load_previous().map_err(|e| as_sync(e, SyncError::FatalInput))?;
        let changes = diff_snapshots(&current, &previous);
        let c = changes.counts();
        let detail = format!(
            "{} current vs {} previous: +{} new, -{} removed, {} moved, {} status, {} capacity, {} citations, {} license date",
            current.len(),
            previous.len(),
            c.added,
            c.removed,
            c.address_changed,
            c.status_changed,
            c.capacity_changed,
            c.citations_changed,
            c.license_date_changed
        );
        st.current = Some(current);
        st.previous = Some(previous);
        st.changes = Some(changes);
        Ok(Done::pass(detail))
    }

    fn resolve_stage(&self, opts: &SyncOptions, st: &mut SyncState) -> StageResult {
        let (Some(current), Some(changes)) = (st.current.as_ref(), st.changes.as_ref()) else {
            return Err(SyncError::FatalInput("no change set to resolve from".into()));
        };
        let queue = plan_resolution(changes);
        if queue.is_empty() {
            return Ok(Done::skipped("no new or moved records"));
        }
        if opts.dry_run {
            return Ok(Done::skipped(format!("dry run: {} queued", queue.len())));
        }

        let mut cache = self.load_cache().map_err(|e| SyncError::FatalInput(e.to_string()))?;
        // Coordinates of a moved record point at the old address.
        let evicted = cache.prune(changes.address_changed.iter().map(|c| &c.id));
        if evicted > 0 {
            info!(evicted, "dropped cached coordinates of moved records");
        }
        let deadline = Duration::from_secs(self.cfg.resolver.stage_timeout_secs);
        let resolver = Resolver::new(&*self.geocoder, self.cfg.resolver_config(Some(deadline)));
        let result = resolver.run(&queue, current, &mut cache);
        st.cache = Some(cache);

        let summary = result.map_err(SyncError::from)?;
        let mut detail = summary.to_string();
        if evicted > 0 {
            detail.push_str(&format!(", {evicted} moved records looked up again"));
        }
        st.resolve = Some(summary);
        Ok(Done::pass(detail))
    }

    fn prune_stage(&self, opts: &SyncOptions, st: &mut SyncState) -> StageResult {
        let Some(changes) = st.changes.as_ref() else {
            return Ok(Done::skipped("no change set"));
        };
        if changes.removed.is_empty() {
            return Ok(Done::skipped("nothing removed"));
        }
        if opts.dry_run {
            return Ok(Done::skipped(format!("dry run: {} would be pruned", changes.removed.len())));
        }
        let housekeeping = |e: CacheError| SyncError::Housekeeping(e.to_string());
        let loaded = match st.cache.take() {
            Some(cache) => cache,
            None => self.load_cache().map_err(housekeeping)?,
        };
        let cache = st.cache.insert(loaded);
        let pruned = cache.prune(&changes.removed);
        cache.checkpoint().map_err(housekeeping)?;
        Ok(Done::pass(format!(
            "{pruned} of {} removed records dropped from cache",
            changes.removed.len()
        )))
    }

    fn stats_stage(&self, st: &mut SyncState) -> StageResult {
        let Some(current) = st.current.as_ref() else {
            return Ok(Done::skipped("no current snapshot"));
        };
        let loaded = match st.cache.take() {
            Some(cache) => cache,
            None => self
                .load_cache()
                .map_err(|e| SyncError::Housekeeping(e.to_string()))?,
        };
        let cache = st.cache.insert(loaded);
        let stats = coverage(current, |id| cache.contains(id));
        let detail = format!(
            "{}/{} active records located ({:.1}%)",
            stats.active_resolved(),
            stats.active_total(),
            stats.coverage_pct()
        );
        st.coverage = Some(stats);
        Ok(Done::pass(detail))
    }

    fn report_stage(
        &self,
        opts: &SyncOptions,
        st: &SyncState,
        stages: &[StageRecord],
        run_dir: Option<&Path>,
    ) -> StageResult {
        let text = render_report(&ReportInput {
            generated_at: Local::now(),
            changes: st.changes.as_ref(),
            resolve: st.resolve.as_ref(),
            coverage: st.coverage.as_ref(),
            stages,
        });
        let mut written = Vec::new();
        if let Some(dir) = run_dir {
            let path = self
                .journal
                .write_report(dir, &text)
                .map_err(|e| SyncError::Housekeeping(format!("{e:#}")))?;
            written.push(path);
        }
        if let Some(path) = self.cfg.report_path(&self.root) {
            if !opts.dry_run {
                write_atomic(&path, text.as_bytes()).map_err(|e| SyncError::Housekeeping(format!("{e:#}")))?;
                written.push(path);
            }
        }
        if written.is_empty() {
            return Ok(Done::skipped("nowhere to write"));
        }
        let names: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
        Ok(Done::pass(names.join(", ")))
    }

    fn backup_stage(&self, opts: &SyncOptions) -> StageResult {
        if opts.dry_run {
            return Ok(Done::skipped("dry run: previous snapshot kept"));
        }
        self.store
            .rotate()
            .map_err(|e| as_sync(e, SyncError::Housekeeping))?;
        Ok(Done::pass("current snapshot is now previous"))
    }

    fn restart_stage(&self, opts: &SyncOptions, st: &mut SyncState) -> StageResult {
        if opts.no_restart {
            return Ok(Done::skipped("--no-restart"));
        }
        if opts.dry_run {
            return Ok(Done::skipped("dry run"));
        }
        let outcome = self
            .lifecycle
            .restart()
            .map_err(|e| SyncError::Lifecycle(e.to_string()))?;
        let mut detail = match &outcome.stopped {
            Some((handle, how)) => format!(
                "stopped pid {} ({}), started pid {}",
                handle.pid,
                match how {
                    StopOutcome::Graceful => "graceful",
                    StopOutcome::Forced => "forced",
                },
                outcome.started.pid
            ),
            None => format!("started pid {}", outcome.started.pid),
        };
        detail.push_str(&format!("; log {}", outcome.started.log_path.display()));
        st.restarted = Some(outcome);
        Ok(Done::pass(detail))
    }
}
