use serde::{Deserialize, Serialize};

/// Licensing status as published in the dataset.
///
/// Unknown spellings are kept verbatim so a diff never loses information.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum FacilityStatus {
    Licensed,
    Pending,
    OnProbation,
    Closed,
    Other(String),
}

impl FacilityStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "LICENSED" => FacilityStatus::Licensed,
            "PENDING" => FacilityStatus::Pending,
            "ON PROBATION" => FacilityStatus::OnProbation,
            "CLOSED" => FacilityStatus::Closed,
            other => FacilityStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FacilityStatus::Licensed => "LICENSED",
            FacilityStatus::Pending => "PENDING",
            FacilityStatus::OnProbation => "ON PROBATION",
            FacilityStatus::Closed => "CLOSED",
            FacilityStatus::Other(s) => s.as_str(),
        }
    }

    /// Statuses the serving process shows to users.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            FacilityStatus::Licensed | FacilityStatus::Pending | FacilityStatus::OnProbation
        )
    }
}

impl From<String> for FacilityStatus {
    fn from(raw: String) -> Self {
        FacilityStatus::parse(&raw)
    }
}

impl From<FacilityStatus> for String {
    fn from(status: FacilityStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for FacilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stages in execution order.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Acquire,
    Diff,
    Resolve,
    Prune,
    Stats,
    Report,
    Backup,
    Restart,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Acquire,
        Stage::Diff,
        Stage::Resolve,
        Stage::Prune,
        Stage::Stats,
        Stage::Report,
        Stage::Backup,
        Stage::Restart,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::Diff => "diff",
            Stage::Resolve => "resolve",
            Stage::Prune => "prune",
            Stage::Stats => "stats",
            Stage::Report => "report",
            Stage::Backup => "backup",
            Stage::Restart => "restart",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pass,
    /// Stage failed but the run continued.
    Degraded,
    /// Stage failed and the run stopped here.
    Fail,
    Skipped,
    /// Never reached because an earlier stage aborted the run.
    NotRun,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_roundtrips_known_values() {
        for raw in ["LICENSED", "PENDING", "ON PROBATION", "CLOSED"] {
            assert_eq!(FacilityStatus::parse(raw).as_str(), raw);
        }
        assert_eq!(
            FacilityStatus::parse("UNLICENSED"),
            FacilityStatus::Other("UNLICENSED".into())
        );
    }

    #[test]
    fn only_non_closed_known_statuses_are_active() {
        assert!(FacilityStatus::Licensed.is_active());
        assert!(FacilityStatus::OnProbation.is_active());
        assert!(!FacilityStatus::Closed.is_active());
        assert!(!FacilityStatus::Other("X".into()).is_active());
    }
}
