use std::collections::BTreeSet;

use crate::{ChangeSet, RecordId, Snapshot};

/// Work queue for the resolver: `added ∪ address_changed`, ordered by id.
///
/// Status, capacity, citation and license-date changes never queue a lookup.
pub fn plan_resolution(changes: &ChangeSet) -> Vec<RecordId> {
    let mut queue: BTreeSet<RecordId> = changes.added.iter().cloned().collect();
    queue.extend(changes.address_changed.iter().map(|c| c.id.clone()));
    queue.into_iter().collect()
}

/// Work queue for a full backfill: every record of `snapshot` not yet resolved.
pub fn plan_backfill<F>(snapshot: &Snapshot, is_resolved: F) -> Vec<RecordId>
where
    F: Fn(&RecordId) -> bool,
{
    snapshot
        .records
        .keys()
        .filter(|id| !is_resolved(id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldChange;

    #[test]
    fn queue_is_union_without_duplicates() {
        let changes = ChangeSet {
            added: vec![RecordId::from_str("B"), RecordId::from_str("A")],
            address_changed: vec![FieldChange {
                id: RecordId::from_str("A"),
                name: "a".into(),
                old: "x".into(),
                new: "y".into(),
            }],
            ..Default::default()
        };
        let q = plan_resolution(&changes);
        assert_eq!(q, vec![RecordId::from_str("A"), RecordId::from_str("B")]);
    }
}
