use std::collections::HashMap;

use crate::{changes::*, ids::RecordId, model::*, snapshot::Snapshot};

/// Classify every difference between `current` and `previous`.
///
/// Pure: `previous` is hashed by id, then one pass over `current` with O(1)
/// lookups and one pass over `previous` for removals. Output lists follow id
/// order. Each field trigger is independent, so a record may land in several
/// field-change lists but never twice in one.
pub fn diff_snapshots(current: &Snapshot, previous: &Snapshot) -> ChangeSet {
    let mut changes = ChangeSet::default();
    let index: HashMap<&RecordId, &Record> = previous.records.iter().collect();

    for (id, cur) in &current.records {
        let Some(prev) = index.get(id).copied() else {
            changes.added.push(id.clone());
            continue;
        };

        if prev.address_key() != cur.address_key() {
            changes.address_changed.push(FieldChange {
                id: id.clone(),
                name: cur.display_name().to_string(),
                old: prev.display_address(),
                new: cur.display_address(),
            });
        }

        if prev.license_date != cur.license_date {
            changes.license_date_changed.push(FieldChange {
                id: id.clone(),
                name: cur.display_name().to_string(),
                old: prev.license_date.clone(),
                new: cur.license_date.clone(),
            });
        }

        let (old_count, new_count) = (prev.citation_count(), cur.citation_count());
        if old_count != new_count {
            changes.citations_changed.push(CitationChange {
                id: id.clone(),
                name: cur.display_name().to_string(),
                old_count,
                new_count,
                delta: new_count as i64 - old_count as i64,
            });
        }

        if prev.status != cur.status {
            changes.status_changed.push(FieldChange {
                id: id.clone(),
                name: cur.display_name().to_string(),
                old: prev.status.clone(),
                new: cur.status.clone(),
            });
        }

        if prev.capacity != cur.capacity {
            changes.capacity_changed.push(FieldChange {
                id: id.clone(),
                name: cur.display_name().to_string(),
                old: prev.capacity.clone(),
                new: cur.capacity.clone(),
            });
        }
    }

    changes.removed = previous
        .records
        .keys()
        .filter(|id| !current.contains(id))
        .cloned()
        .collect();

    changes
}

/// Records in `current` that appear in no category at all.
pub fn unchanged_count(current: &Snapshot, changes: &ChangeSet) -> usize {
    let mut touched = std::collections::BTreeSet::new();
    touched.extend(changes.added.iter());
    touched.extend(changes.address_changed.iter().map(|c| &c.id));
    touched.extend(changes.license_date_changed.iter().map(|c| &c.id));
    touched.extend(changes.citations_changed.iter().map(|c| &c.id));
    touched.extend(changes.status_changed.iter().map(|c| &c.id));
    touched.extend(changes.capacity_changed.iter().map(|c| &c.id));
    current.len() - touched.len()
}
