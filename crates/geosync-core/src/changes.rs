use serde::Serialize;

use crate::{ids::*, types::*};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldChange<T> {
    pub id: RecordId,
    pub name: String,
    pub old: T,
    pub new: T,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CitationChange {
    pub id: RecordId,
    pub name: String,
    pub old_count: usize,
    pub new_count: usize,
    pub delta: i64,
}

/// Classified difference between the current and previous snapshot.
///
/// Every list is ordered by record id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub added: Vec<RecordId>,
    pub removed: Vec<RecordId>,
    /// Old/new values are full display addresses, region included.
    pub address_changed: Vec<FieldChange<String>>,
    pub license_date_changed: Vec<FieldChange<String>>,
    pub citations_changed: Vec<CitationChange>,
    pub status_changed: Vec<FieldChange<FacilityStatus>>,
    pub capacity_changed: Vec<FieldChange<String>>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.address_changed.is_empty()
            && self.license_date_changed.is_empty()
            && self.citations_changed.is_empty()
            && self.status_changed.is_empty()
            && self.capacity_changed.is_empty()
    }

    /// True when at least one record needs a fresh lookup.
    pub fn requires_resolution(&self) -> bool {
        !self.added.is_empty() || !self.address_changed.is_empty()
    }

    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            added: self.added.len(),
            removed: self.removed.len(),
            address_changed: self.address_changed.len(),
            license_date_changed: self.license_date_changed.len(),
            citations_changed: self.citations_changed.len(),
            status_changed: self.status_changed.len(),
            capacity_changed: self.capacity_changed.len(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangeCounts {
    pub added: usize,
    pub removed: usize,
    pub address_changed: usize,
    pub license_date_changed: usize,
    pub citations_changed: usize,
    pub status_changed: usize,
    pub capacity_changed: usize,
}
