use std::time::{Duration, Instant};

use geosync_cache::{CacheError, ResolutionCache};
use geosync_core::{RecordId, Snapshot, SyncError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    geocoder::{build_query, Geocoder},
    pacer::Pacer,
};

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    /// Minimum spacing between external calls.
    pub interval: Duration,
    /// Checkpoint after this many processed ids (successes, failures and precondition skips).
    pub checkpoint_every: usize,
    /// Wall-clock budget for the whole run.
    pub deadline: Option<Duration>,
    pub query_suffix: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            checkpoint_every: 100,
            deadline: None,
            query_suffix: "USA".into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResolveSummary {
    pub queued: usize,
    pub geocoded: usize,
    /// Lookups that returned nothing usable.
    pub failed: usize,
    /// Blank street, city or region; no lookup attempted.
    pub skipped_precondition: usize,
    pub skipped_cached: usize,
    /// Queued ids with no record in the snapshot.
    pub not_in_snapshot: usize,
    pub lookups: usize,
    /// Rate-limit pauses taken; one per external call.
    pub pauses: u64,
    pub checkpoints: u32,
}

impl ResolveSummary {
    pub fn failed_total(&self) -> usize {
        self.failed + self.skipped_precondition
    }

    pub fn attempted(&self) -> usize {
        self.geocoded + self.failed_total()
    }
}

impl std::fmt::Display for ResolveSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "geocoded {}/{}, failed {} ({} missing address), already cached {}",
            self.geocoded,
            self.attempted(),
            self.failed_total(),
            self.skipped_precondition,
            self.skipped_cached
        )
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The cache holds everything resolved up to the last checkpoint, which
    /// was written before returning.
    #[error("resolution exceeded {limit_secs}s ({partial})")]
    DeadlineExceeded { limit_secs: u64, partial: ResolveSummary },
    #[error(transparent)]
    Checkpoint(#[from] CacheError),
}

impl From<ResolveError> for SyncError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::DeadlineExceeded { limit_secs, .. } => SyncError::ExternalTimeout {
                what: "resolve".into(),
                secs: limit_secs,
            },
            ResolveError::Checkpoint(e) => SyncError::ExternalFailure(format!("cache checkpoint: {e}")),
        }
    }
}

/// Drives lookups for a work queue, strictly one at a time.
pub struct Resolver<G: Geocoder> {
    geocoder: G,
    config: ResolverConfig,
}

impl<G: Geocoder> Resolver<G> {
    pub fn new(geocoder: G, config: ResolverConfig) -> Self {
        Self { geocoder, config }
    }

    /// Resolve every queued id not already in `cache`.
    ///
    /// Successes are merged; failures leave no entry and are retried by the
    /// next run. The cache is checkpointed every `checkpoint_every` processed
    /// ids and once more at the end.
    pub fn run(
        &self,
        queue: &[RecordId],
        snapshot: &Snapshot,
        cache: &mut ResolutionCache,
    ) -> Result<ResolveSummary, ResolveError> {
        let started = Instant::now();
        let checkpoints_before = cache.checkpoints_written();
        let mut pacer = Pacer::new(self.config.interval);
        let checkpoint_every = self.config.checkpoint_every.max(1);
        let mut summary = ResolveSummary {
            queued: queue.len(),
            ..Default::default()
        };

        let pending = queue.iter().filter(|id| !cache.contains(id)).count();
        info!(
            queued = queue.len(),
            pending,
            eta_secs = pacer.estimate(pending).as_secs(),
            "starting resolution"
        );

        let mut processed = 0usize;
        for id in queue {
            if cache.contains(id) {
                summary.skipped_cached += 1;
                continue;
            }
            let Some(record) = snapshot.get(id) else {
                warn!(record_id = %id, "queued id missing from snapshot");
                summary.not_in_snapshot += 1;
                continue;
            };

            if !record.has_resolvable_address() {
                debug!(record_id = %id, "missing address components; skipped");
                summary.skipped_precondition += 1;
            } else {
                if let Some(limit) = self.config.deadline {
                    if started.elapsed() >= limit {
                        cache.checkpoint()?;
                        summary.pauses = pacer.pauses();
                        summary.checkpoints = cache.checkpoints_written() - checkpoints_before;
                        warn!(limit_secs = limit.as_secs(), %summary, "resolution deadline reached");
                        return Err(ResolveError::DeadlineExceeded {
                            limit_secs: limit.as_secs(),
                            partial: summary,
                        });
                    }
                }

                let query = build_query(record, &self.config.query_suffix);
                summary.lookups += 1;
                match self.geocoder.geocode(&query) {
                    Ok(hit) => {
                        cache.merge(id.clone(), hit.coords);
                        summary.geocoded += 1;
                        if summary.geocoded % 10 == 0 {
                            info!(
                                geocoded = summary.geocoded,
                                of = pending,
                                last_city = %record.city,
                                "progress"
                            );
                        }
                    }
                    Err(e) => {
                        summary.failed += 1;
                        warn!(record_id = %id, address = %record.display_address(), error = %e, "lookup failed");
                    }
                }
                pacer.pause();
            }

            processed += 1;
            if processed % checkpoint_every == 0 {
                cache.checkpoint()?;
                debug!(processed, entries = cache.len(), "checkpoint");
            }
        }

        cache.checkpoint()?;
        summary.pauses = pacer.pauses();
        summary.checkpoints = cache.checkpoints_written() - checkpoints_before;
        info!(%summary, elapsed_secs = started.elapsed().as_secs(), "resolution finished");
        Ok(summary)
    }
}
