use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{ids::*, model::*};

/// A complete point-in-time capture of the dataset, keyed by record id.
///
/// Duplicate ids in the source collapse to the last occurrence.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub captured_at: Option<DateTime<Utc>>,
    /// Hex sha256 of the source bytes, when loaded from a file.
    pub digest: Option<String>,
    pub records: BTreeMap<RecordId, Record>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            captured_at: None,
            digest: None,
            records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }
}
