use std::collections::BTreeSet;

use geosync_core::{
    coverage, diff_snapshots, plan_resolution, unchanged_count, Coordinates, FacilityStatus, Record, RecordId,
    Snapshot,
};

fn record(id: &str) -> Record {
    Record {
        id: RecordId::from_str(id),
        name: format!("Home {id}"),
        street: format!("{id} Main St"),
        city: "Sacramento".into(),
        region: "CA".into(),
        postal: "95814".into(),
        status: FacilityStatus::Licensed,
        capacity: "6".into(),
        license_date: "03/04/2019".into(),
        citations: "C1, C2".into(),
    }
}

/// Deterministic pair of snapshots exercising every category at once.
fn mixed_pair() -> (Snapshot, Snapshot) {
    let mut previous = Vec::new();
    let mut current = Vec::new();
    for i in 0..40 {
        let id = format!("{i:03}");
        let base = record(&id);
        let mut cur = base.clone();
        match i % 8 {
            0 => {
                previous.push(base);
                continue;
            }
            1 => {
                current.push(base);
                continue;
            }
            2 => cur.street = format!("{i} Oak Ave"),
            3 => cur.status = FacilityStatus::OnProbation,
            4 => cur.capacity = "12".into(),
            5 => {
                cur.citations = "C1, C2, C3".into();
                cur.license_date = "01/01/2024".into();
            }
            6 => {
                cur.postal = "95815".into();
                cur.status = FacilityStatus::Closed;
            }
            _ => {}
        }
        previous.push(base);
        current.push(cur);
    }
    (Snapshot::from_records(current), Snapshot::from_records(previous))
}

#[test]
fn added_and_removed_are_disjoint() {
    let (current, previous) = mixed_pair();
    let changes = diff_snapshots(&current, &previous);
    let added: BTreeSet<_> = changes.added.iter().collect();
    let removed: BTreeSet<_> = changes.removed.iter().collect();
    assert!(added.is_disjoint(&removed));
    assert_eq!(changes.added.len(), 5);
    assert_eq!(changes.removed.len(), 5);
}

#[test]
fn every_current_record_is_classified_once() {
    let (current, previous) = mixed_pair();
    let changes = diff_snapshots(&current, &previous);

    let added: BTreeSet<_> = changes.added.iter().cloned().collect();
    let mut field_changed = BTreeSet::new();
    for list in [
        changes.address_changed.iter().map(|c| c.id.clone()).collect::<Vec<_>>(),
        changes.license_date_changed.iter().map(|c| c.id.clone()).collect(),
        changes.citations_changed.iter().map(|c| c.id.clone()).collect(),
        changes.status_changed.iter().map(|c| c.id.clone()).collect(),
        changes.capacity_changed.iter().map(|c| c.id.clone()).collect(),
    ] {
        let unique: BTreeSet<_> = list.iter().cloned().collect();
        assert_eq!(unique.len(), list.len(), "duplicate id inside one change list");
        field_changed.extend(unique);
    }

    assert!(added.is_disjoint(&field_changed));
    let unchanged = unchanged_count(&current, &changes);
    assert_eq!(added.len() + field_changed.len() + unchanged, current.len());
    for id in current.records.keys() {
        assert!(previous.contains(id) || added.contains(id));
    }
}

#[test]
fn self_diff_is_empty() {
    let (current, _) = mixed_pair();
    let changes = diff_snapshots(&current, &current);
    assert!(changes.is_empty());
    assert!(plan_resolution(&changes).is_empty());
}

#[test]
fn identical_address_never_queued() {
    let (current, previous) = mixed_pair();
    let changes = diff_snapshots(&current, &previous);
    let queue = plan_resolution(&changes);
    for id in &queue {
        let cur = current.get(id).unwrap();
        if let Some(prev) = previous.get(id) {
            assert_ne!(prev.address_key(), cur.address_key());
        }
    }
    for c in &changes.status_changed {
        let same_addr = current.get(&c.id).unwrap().address_key() == previous.get(&c.id).unwrap().address_key();
        assert_eq!(queue.contains(&c.id), !same_addr);
    }
}

#[test]
fn queue_covers_added_and_moved_records() {
    let (current, previous) = mixed_pair();
    let changes = diff_snapshots(&current, &previous);
    let queue = plan_resolution(&changes);
    // 5 added, 5 street moves, 5 postal moves
    assert_eq!(queue.len(), 15);
}

#[test]
fn coverage_counts_active_only() {
    let mut closed = record("C");
    closed.status = FacilityStatus::Closed;
    let mut pending = record("P");
    pending.status = FacilityStatus::Pending;
    let snapshot = Snapshot::from_records([record("A"), record("B"), closed, pending]);

    let resolved: BTreeSet<RecordId> = ["A", "C"].into_iter().map(RecordId::from_str).collect();
    let stats = coverage(&snapshot, |id| resolved.contains(id));

    assert_eq!(stats.total, 4);
    assert_eq!(stats.active_total(), 3);
    assert_eq!(stats.active_resolved(), 1);
    assert_eq!(stats.closed.resolved, 1);
    assert!((stats.coverage_pct() - 33.333).abs() < 0.01);
}

#[test]
fn coordinates_use_short_keys_on_disk() {
    let json = serde_json::to_string(&Coordinates::new(34.0, -118.0)).unwrap();
    assert_eq!(json, r#"{"lat":34.0,"lon":-118.0}"#);
}
