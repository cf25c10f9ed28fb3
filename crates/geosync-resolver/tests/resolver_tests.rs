use std::time::Duration;

use geosync_cache::ResolutionCache;
use geosync_core::{Coordinates, FacilityStatus, Record, RecordId, Snapshot};
use geosync_resolver::{LookupError, ResolveError, Resolver, ResolverConfig, ScriptedGeocoder};
use tempfile::tempdir;

fn record(id: &str, city: &str) -> Record {
    Record {
        id: RecordId::from_str(id),
        name: format!("Home {id}"),
        street: format!("{id} Elm St"),
        city: city.into(),
        region: "CA".into(),
        postal: "90001".into(),
        status: FacilityStatus::Licensed,
        capacity: "6".into(),
        license_date: String::new(),
        citations: String::new(),
    }
}

fn ids(raw: &[&str]) -> Vec<RecordId> {
    raw.iter().map(|s| RecordId::from_str(*s)).collect()
}

fn fast(checkpoint_every: usize) -> ResolverConfig {
    ResolverConfig {
        interval: Duration::ZERO,
        checkpoint_every,
        ..Default::default()
    }
}

const HERE: Coordinates = Coordinates {
    latitude: 34.05,
    longitude: -118.24,
};

#[test]
fn blank_city_makes_no_external_call() {
    let dir = tempdir().unwrap();
    let mut cache = ResolutionCache::empty(&dir.path().join("cache.json"));
    let snapshot = Snapshot::from_records([record("X", "  ")]);
    let geocoder = ScriptedGeocoder::always(HERE);

    let summary = Resolver::new(&geocoder, fast(100))
        .run(&ids(&["X"]), &snapshot, &mut cache)
        .unwrap();

    assert_eq!(geocoder.call_count(), 0);
    assert_eq!(summary.skipped_precondition, 1);
    assert_eq!(summary.failed_total(), 1);
    assert_eq!(summary.lookups, 0);
    assert!(cache.lookup(&RecordId::from_str("X")).is_none());
}

#[test]
fn failures_are_not_cached() {
    let dir = tempdir().unwrap();
    let mut cache = ResolutionCache::empty(&dir.path().join("cache.json"));
    let snapshot = Snapshot::from_records([record("A", "Fresno"), record("B", "Nowhere")]);
    let geocoder = ScriptedGeocoder::always(HERE).on("Nowhere", Err(LookupError::NoMatch));

    let summary = Resolver::new(&geocoder, fast(100))
        .run(&ids(&["A", "B"]), &snapshot, &mut cache)
        .unwrap();

    assert_eq!(summary.geocoded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(cache.lookup(&RecordId::from_str("A")), Some(HERE));
    assert!(!cache.contains(&RecordId::from_str("B")));
    assert_eq!(geocoder.calls()[0], "A Elm St, Fresno, CA 90001, USA");
}

#[test]
fn resume_only_looks_up_uncached_ids() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let records: Vec<_> = (0..6).map(|i| record(&format!("R{i}"), "Fresno")).collect();
    let snapshot = Snapshot::from_records(records);
    let queue = ids(&["R0", "R1", "R2", "R3", "R4", "R5"]);

    // First run dies after resolving the first three and checkpointing.
    {
        let mut cache = ResolutionCache::empty(&path);
        let geocoder = ScriptedGeocoder::always(HERE);
        Resolver::new(&geocoder, fast(3))
            .run(&queue[..3], &snapshot, &mut cache)
            .unwrap();
    }

    let mut cache = ResolutionCache::load(&path).unwrap();
    assert_eq!(cache.len(), 3);
    let geocoder = ScriptedGeocoder::always(HERE);
    let summary = Resolver::new(&geocoder, fast(3))
        .run(&queue, &snapshot, &mut cache)
        .unwrap();

    assert_eq!(summary.skipped_cached, 3);
    assert_eq!(summary.geocoded, 3);
    let calls = geocoder.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|q| q.starts_with("R3") || q.starts_with("R4") || q.starts_with("R5")));
}

#[test]
fn checkpoints_every_batch_and_at_end() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let mut cache = ResolutionCache::empty(&path);
    let mut records: Vec<_> = (0..5).map(|i| record(&format!("R{i}"), "Fresno")).collect();
    records.push(record("R5", ""));
    let snapshot = Snapshot::from_records(records);
    let queue = ids(&["R0", "R1", "R2", "R3", "R4", "R5", "GONE"]);

    let geocoder = ScriptedGeocoder::always(HERE);
    let summary = Resolver::new(&geocoder, fast(2))
        .run(&queue, &snapshot, &mut cache)
        .unwrap();

    // six processed ids: batches after 2, 4, 6, then the final one
    assert_eq!(summary.checkpoints, 4);
    assert_eq!(summary.not_in_snapshot, 1);
    assert_eq!(ResolutionCache::load(&path).unwrap().len(), 5);
}

#[test]
fn deadline_checkpoints_before_failing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let mut cache = ResolutionCache::empty(&path);
    let snapshot = Snapshot::from_records([record("A", "Fresno")]);
    let geocoder = ScriptedGeocoder::always(HERE);
    let config = ResolverConfig {
        deadline: Some(Duration::ZERO),
        ..fast(100)
    };

    let err = Resolver::new(&geocoder, config)
        .run(&ids(&["A"]), &snapshot, &mut cache)
        .unwrap_err();

    assert!(matches!(err, ResolveError::DeadlineExceeded { .. }));
    assert_eq!(geocoder.call_count(), 0);
    assert!(path.exists());
}

#[test]
fn every_lookup_is_paced_and_skips_are_not() {
    let dir = tempdir().unwrap();
    let mut cache = ResolutionCache::empty(&dir.path().join("cache.json"));
    cache.merge(RecordId::from_str("C"), HERE);
    let snapshot = Snapshot::from_records([
        record("A", "Fresno"),
        record("B", "Nowhere"),
        record("C", "Fresno"),
        record("D", ""),
    ]);
    let geocoder = ScriptedGeocoder::always(HERE).on("Nowhere", Err(LookupError::Timeout));
    let config = ResolverConfig {
        interval: Duration::from_millis(20),
        ..fast(100)
    };

    let started = std::time::Instant::now();
    let summary = Resolver::new(&geocoder, config)
        .run(&ids(&["A", "B", "C", "D"]), &snapshot, &mut cache)
        .unwrap();

    assert_eq!(summary.lookups, 2);
    assert_eq!(summary.pauses, 2);
    assert_eq!((summary.geocoded, summary.failed), (1, 1));
    assert_eq!((summary.skipped_cached, summary.skipped_precondition), (1, 1));
    assert!(started.elapsed() >= Duration::from_millis(40));
}
