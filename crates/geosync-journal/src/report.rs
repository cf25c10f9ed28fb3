use std::fmt::Write;

use chrono::{DateTime, Local};
use geosync_core::{ChangeSet, CoverageStats, StageStatus, StatusCoverage};
use geosync_resolver::ResolveSummary;

use crate::manifest::StageRecord;

const LICENSE_SAMPLES: usize = 5;
const CITATION_SAMPLES: usize = 5;
const STATUS_SAMPLES: usize = 10;

/// Everything a report can mention. Absent parts are left out of the output.
pub struct ReportInput<'a> {
    pub generated_at: DateTime<Local>,
    pub changes: Option<&'a ChangeSet>,
    pub resolve: Option<&'a ResolveSummary>,
    pub coverage: Option<&'a CoverageStats>,
    pub stages: &'a [StageRecord],
}

pub fn render_report(input: &ReportInput<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Data update: {}\n", input.generated_at.format("%B %d, %Y"));

    if let Some(changes) = input.changes {
        render_changes(&mut out, changes);
    }
    if let Some(summary) = input.resolve {
        let _ = writeln!(out, "## Resolution\n");
        let _ = writeln!(out, "{summary}\n");
    }
    if let Some(stats) = input.coverage {
        render_coverage(&mut out, stats);
    }
    if !input.stages.is_empty() {
        let _ = writeln!(out, "## Stages\n");
        let _ = writeln!(out, "| stage | outcome | detail |");
        let _ = writeln!(out, "|---|---|---|");
        for s in input.stages {
            let _ = writeln!(out, "| {} | {} | {} |", s.stage, status_label(&s.status), s.detail.replace('|', "/"));
        }
        out.push('\n');
    }
    out
}

pub fn render_changes(out: &mut String, changes: &ChangeSet) {
    let c = changes.counts();
    let _ = writeln!(out, "## Changes\n");
    let _ = writeln!(out, "- New: {}", c.added);
    let _ = writeln!(out, "- Address changes: {} (require re-resolution)", c.address_changed);
    let _ = writeln!(out, "- License date changes: {}", c.license_date_changed);
    let _ = writeln!(out, "- Citation changes: {}", c.citations_changed);
    let _ = writeln!(out, "- Status changes: {}", c.status_changed);
    let _ = writeln!(out, "- Capacity changes: {}", c.capacity_changed);
    let _ = writeln!(out, "- Removed: {}", c.removed);
    let _ = writeln!(out, "- Total to resolve: {}\n", c.added + c.address_changed);

    if !changes.license_date_changed.is_empty() {
        let _ = writeln!(out, "### License date changes\n");
        for ch in changes.license_date_changed.iter().take(LICENSE_SAMPLES) {
            let _ = writeln!(out, "- {}: {} -> {}", ch.name, or_na(&ch.old), or_na(&ch.new));
        }
        more(out, changes.license_date_changed.len(), LICENSE_SAMPLES);
    }

    let increases: Vec<_> = changes.citations_changed.iter().filter(|c| c.delta > 0).collect();
    if !increases.is_empty() {
        let _ = writeln!(out, "### Citation increases\n");
        for ch in increases.iter().take(CITATION_SAMPLES) {
            let _ = writeln!(out, "- {}: {} -> {} (+{})", ch.name, ch.old_count, ch.new_count, ch.delta);
        }
        more(out, increases.len(), CITATION_SAMPLES);
    }

    if !changes.status_changed.is_empty() {
        let _ = writeln!(out, "### Status changes\n");
        for ch in changes.status_changed.iter().take(STATUS_SAMPLES) {
            let _ = writeln!(out, "- {}: {} -> {}", ch.name, or_na(ch.old.as_str()), or_na(ch.new.as_str()));
        }
        more(out, changes.status_changed.len(), STATUS_SAMPLES);
    }
}

pub fn render_coverage(out: &mut String, stats: &CoverageStats) {
    let _ = writeln!(out, "## Coverage\n");
    let _ = writeln!(out, "| status | records | located |");
    let _ = writeln!(out, "|---|---:|---:|");
    let rows: [(&str, &StatusCoverage); 5] = [
        ("LICENSED", &stats.licensed),
        ("PENDING", &stats.pending),
        ("ON PROBATION", &stats.on_probation),
        ("CLOSED", &stats.closed),
        ("other", &stats.other),
    ];
    for (label, row) in rows {
        if row.total > 0 {
            let _ = writeln!(out, "| {label} | {} | {} |", row.total, row.resolved);
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "- Total records: {}", stats.total);
    let _ = writeln!(out, "- Active records: {}", stats.active_total());
    let _ = writeln!(out, "- Active with location: {}", stats.active_resolved());
    let _ = writeln!(out, "- Coverage: {:.1}%\n", stats.coverage_pct());
}

fn more(out: &mut String, total: usize, shown: usize) {
    if total > shown {
        let _ = writeln!(out, "- ... and {} more", total - shown);
    }
    out.push('\n');
}

fn or_na(s: &str) -> &str {
    if s.is_empty() {
        "N/A"
    } else {
        s
    }
}

pub fn status_label(status: &StageStatus) -> &'static str {
    match status {
        StageStatus::Pass => "pass",
        StageStatus::Degraded => "degraded",
        StageStatus::Fail => "FAIL",
        StageStatus::Skipped => "skipped",
        StageStatus::NotRun => "not run",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use geosync_core::{CitationChange, FacilityStatus, FieldChange, RecordId, Stage};

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 2, 8, 0, 0).unwrap()
    }

    fn citation(id: &str, old: usize, new: usize) -> CitationChange {
        CitationChange {
            id: RecordId::from_str(id),
            name: format!("Home {id}"),
            old_count: old,
            new_count: new,
            delta: new as i64 - old as i64,
        }
    }

    #[test]
    fn samples_are_capped_and_decreases_hidden() {
        let mut changes = ChangeSet::default();
        changes.citations_changed.push(citation("down", 3, 1));
        for i in 0..7 {
            changes.citations_changed.push(citation(&format!("up{i}"), 0, 2));
        }
        for i in 0..12 {
            changes.status_changed.push(FieldChange {
                id: RecordId::from_str(format!("s{i}")),
                name: format!("S{i}"),
                old: FacilityStatus::Licensed,
                new: FacilityStatus::OnProbation,
            });
        }

        let text = render_report(&ReportInput {
            generated_at: at(),
            changes: Some(&changes),
            resolve: None,
            coverage: None,
            stages: &[],
        });

        assert!(text.starts_with("# Data update: January 02, 2026"));
        assert!(!text.contains("Home down"));
        assert!(text.contains("- Home up0: 0 -> 2 (+2)"));
        assert!(!text.contains("Home up5"));
        assert!(text.contains("- ... and 2 more"));
        assert!(text.contains("- S9: LICENSED -> ON PROBATION"));
        assert!(!text.contains("- S10:"));
        assert!(text.contains("- Total to resolve: 0"));
    }

    #[test]
    fn coverage_and_stages_render() {
        let stats = CoverageStats {
            total: 4,
            licensed: StatusCoverage { total: 2, resolved: 2 },
            closed: StatusCoverage { total: 2, resolved: 0 },
            ..Default::default()
        };
        let stages = [StageRecord {
            stage: Stage::Restart,
            status: StageStatus::Degraded,
            detail: "exited early".into(),
            elapsed_ms: 5,
        }];
        let text = render_report(&ReportInput {
            generated_at: at(),
            changes: None,
            resolve: None,
            coverage: Some(&stats),
            stages: &stages,
        });
        assert!(text.contains("| LICENSED | 2 | 2 |"));
        assert!(!text.contains("| PENDING |"));
        assert!(text.contains("- Coverage: 100.0%"));
        assert!(text.contains("| restart | degraded | exited early |"));
    }
}
