use serde::Serialize;

use crate::{FacilityStatus, RecordId, Snapshot};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCoverage {
    pub total: usize,
    pub resolved: usize,
}

/// Resolved-vs-total counts per status, derived by intersecting the cache
/// keys with the current snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoverageStats {
    pub total: usize,
    pub licensed: StatusCoverage,
    pub pending: StatusCoverage,
    pub on_probation: StatusCoverage,
    pub closed: StatusCoverage,
    pub other: StatusCoverage,
}

impl CoverageStats {
    pub fn active_total(&self) -> usize {
        self.licensed.total + self.pending.total + self.on_probation.total
    }

    pub fn active_resolved(&self) -> usize {
        self.licensed.resolved + self.pending.resolved + self.on_probation.resolved
    }

    /// Percentage of active records with a location; 0 when nothing is active.
    pub fn coverage_pct(&self) -> f64 {
        match self.active_total() {
            0 => 0.0,
            n => self.active_resolved() as f64 / n as f64 * 100.0,
        }
    }
}

pub fn coverage<F>(snapshot: &Snapshot, is_resolved: F) -> CoverageStats
where
    F: Fn(&RecordId) -> bool,
{
    let mut stats = CoverageStats {
        total: snapshot.len(),
        ..Default::default()
    };
    for record in snapshot.iter() {
        let bucket = match record.status {
            FacilityStatus::Licensed => &mut stats.licensed,
            FacilityStatus::Pending => &mut stats.pending,
            FacilityStatus::OnProbation => &mut stats.on_probation,
            FacilityStatus::Closed => &mut stats.closed,
            FacilityStatus::Other(_) => &mut stats.other,
        };
        bucket.total += 1;
        if is_resolved(&record.id) {
            bucket.resolved += 1;
        }
    }
    stats
}
