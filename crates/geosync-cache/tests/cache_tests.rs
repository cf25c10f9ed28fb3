use geosync_cache::{CacheError, ResolutionCache};
use geosync_core::{Coordinates, RecordId};
use tempfile::tempdir;

#[test]
fn missing_file_loads_empty() {
    let dir = tempdir().unwrap();
    let cache = ResolutionCache::load(&dir.path().join("nope.json")).unwrap();
    assert!(cache.is_empty());
}

#[test]
fn checkpoint_then_reload_roundtrips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("geocode_cache.json");
    let mut cache = ResolutionCache::load(&path).unwrap();
    for (i, id) in ["300", "100", "200"].iter().enumerate() {
        cache.merge(RecordId::from_str(*id), Coordinates::new(34.0 + i as f64, -118.25));
    }
    cache.checkpoint().unwrap();
    assert_eq!(cache.checkpoints_written(), 1);

    let reloaded = ResolutionCache::load(&path).unwrap();
    assert_eq!(reloaded.len(), 3);
    for id in cache.ids() {
        assert_eq!(reloaded.lookup(id), cache.lookup(id));
    }
}

#[test]
fn file_is_human_readable_and_sorted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let mut cache = ResolutionCache::empty(&path);
    cache.merge(RecordId::from_str("b"), Coordinates::new(1.5, 2.5));
    cache.merge(RecordId::from_str("a"), Coordinates::new(3.5, 4.5));
    cache.checkpoint().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"lat\": 3.5"));
    assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
}

#[test]
fn checkpoint_replaces_without_leftovers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let mut cache = ResolutionCache::empty(&path);
    cache.merge(RecordId::from_str("a"), Coordinates::new(1.0, 2.0));
    cache.checkpoint().unwrap();
    cache.prune(&[RecordId::from_str("a")]);
    cache.checkpoint().unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert!(ResolutionCache::load(&path).unwrap().is_empty());
}

#[test]
fn corrupt_file_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "{ \"a\": { \"lat\": 1.0 ").unwrap();
    assert!(matches!(ResolutionCache::load(&path), Err(CacheError::Corrupt { .. })));
}
