use std::sync::Mutex;

use geosync_core::{Snapshot, SyncError};

use crate::traits::SnapshotStore;

/// In-memory store for tests. Not durable.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    current: Option<Snapshot>,
    previous: Option<Snapshot>,
    rotations: u32,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(current: Option<Snapshot>, previous: Option<Snapshot>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current,
                previous,
                rotations: 0,
            }),
        }
    }

    pub fn set_current(&self, snapshot: Snapshot) {
        self.lock().current = Some(snapshot);
    }

    pub fn previous(&self) -> Option<Snapshot> {
        self.lock().previous.clone()
    }

    pub fn rotations(&self) -> u32 {
        self.lock().rotations
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load_current(&self) -> anyhow::Result<Snapshot> {
        self.lock()
            .current
            .clone()
            .ok_or_else(|| SyncError::FatalInput("no current snapshot".into()).into())
    }

    fn load_previous(&self) -> anyhow::Result<Snapshot> {
        Ok(self.lock().previous.clone().unwrap_or_default())
    }

    fn has_current(&self) -> bool {
        self.lock().current.is_some()
    }

    fn rotate(&self) -> anyhow::Result<()> {
        let mut inner = self.lock();
        let current = inner
            .current
            .clone()
            .ok_or_else(|| SyncError::FatalInput("no current snapshot to rotate".into()))?;
        inner.previous = Some(current);
        inner.rotations += 1;
        Ok(())
    }
}
