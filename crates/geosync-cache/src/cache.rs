use std::collections::{BTreeMap, HashMap};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use geosync_core::{Coordinates, RecordId};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache file {path} is not a valid mapping: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistent record id -> coordinates mapping.
///
/// Single writer. Readers (the serving process) only ever see a complete file:
/// every checkpoint goes to a sibling temp file that is then renamed over the
/// target.
#[derive(Debug)]
pub struct ResolutionCache {
    path: PathBuf,
    entries: HashMap<RecordId, Coordinates>,
    checkpoints: u32,
}

impl ResolutionCache {
    /// Load from `path`. A missing file is the bootstrap state and yields an empty cache.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        if !path.exists() {
            info!(path = %path.display(), "no cache file yet; starting empty");
            return Ok(Self::empty(path));
        }
        let bytes = std::fs::read(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: HashMap<RecordId, Coordinates> =
            serde_json::from_slice(&bytes).map_err(|source| CacheError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), entries = entries.len(), "loaded cache");
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            checkpoints: 0,
        })
    }

    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: HashMap::new(),
            checkpoints: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lookup(&self, id: &RecordId) -> Option<Coordinates> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn merge(&mut self, id: RecordId, coords: Coordinates) {
        self.entries.insert(id, coords);
    }

    /// Drop every given id. Returns how many entries were actually present.
    pub fn prune<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a RecordId>,
    {
        ids.into_iter().filter(|id| self.entries.remove(*id).is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.entries.keys()
    }

    /// Number of checkpoints written by this instance.
    pub fn checkpoints_written(&self) -> u32 {
        self.checkpoints
    }

    /// Atomically replace the cache file with the full in-memory mapping.
    pub fn checkpoint(&mut self) -> Result<(), CacheError> {
        let io_err = |source| CacheError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        // sorted output keeps the file diffable
        let sorted: BTreeMap<&RecordId, &Coordinates> = self.entries.iter().collect();

        let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        {
            let mut w = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut w, &sorted).map_err(|source| CacheError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
            w.flush().map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        sync_dir(&dir);

        self.checkpoints += 1;
        debug!(path = %self.path.display(), entries = self.entries.len(), "cache checkpoint");
        Ok(())
    }
}

/// Make the rename itself durable. Best-effort; not every platform allows it.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    if let Ok(d) = std::fs::File::open(dir) {
        let _ = d.sync_all();
    }
    #[cfg(not(unix))]
    let _ = dir;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn prune_then_lookup_is_empty() {
        let dir = tempdir().unwrap();
        let mut cache = ResolutionCache::empty(&dir.path().join("cache.json"));
        cache.merge(RecordId::from_str("A"), Coordinates::new(34.0, -118.0));
        cache.merge(RecordId::from_str("B"), Coordinates::new(35.0, -119.0));

        let removed = cache.prune(&[RecordId::from_str("A"), RecordId::from_str("Z")]);
        assert_eq!(removed, 1);
        assert_eq!(cache.lookup(&RecordId::from_str("A")), None);
        assert_eq!(cache.lookup(&RecordId::from_str("B")), Some(Coordinates::new(35.0, -119.0)));
    }

    #[test]
    fn merge_overwrites_single_entry() {
        let dir = tempdir().unwrap();
        let mut cache = ResolutionCache::empty(&dir.path().join("cache.json"));
        cache.merge(RecordId::from_str("A"), Coordinates::new(1.0, 1.0));
        cache.merge(RecordId::from_str("A"), Coordinates::new(2.0, 2.0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&RecordId::from_str("A")), Some(Coordinates::new(2.0, 2.0)));
    }
}
