use geosync_core::Snapshot;

/// Durable home of the `current` and `previous` snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Fails with `SyncError::FatalInput` when the current snapshot is missing or unreadable.
    fn load_current(&self) -> anyhow::Result<Snapshot>;

    /// A missing previous snapshot is the first-run state and yields an empty snapshot.
    fn load_previous(&self) -> anyhow::Result<Snapshot>;

    fn has_current(&self) -> bool;

    /// Make `current` the new `previous`. Atomic: a crash leaves either the old or the new previous.
    fn rotate(&self) -> anyhow::Result<()>;
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for std::sync::Arc<T> {
    fn load_current(&self) -> anyhow::Result<Snapshot> {
        (**self).load_current()
    }
    fn load_previous(&self) -> anyhow::Result<Snapshot> {
        (**self).load_previous()
    }
    fn has_current(&self) -> bool {
        (**self).has_current()
    }
    fn rotate(&self) -> anyhow::Result<()> {
        (**self).rotate()
    }
}
