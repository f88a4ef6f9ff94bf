//! Configuration for the record log.

/// Flush/sync strategy applied to each committed record.
#[derive(Clone, Debug)]
pub enum SyncPolicy {
    /// `fsync` after every commit (safest, highest latency).
    EveryCommit,
    /// Flush to the OS page cache and let the kernel schedule the write.
    OsBuffered,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self::OsBuffered
    }
}

/// Configuration for a [`RecordLog`](crate::record::RecordLog).
#[derive(Clone, Debug)]
pub struct LogConfig {
    /// Sync/flush strategy.
    pub sync: SyncPolicy,
    /// Rewrite the log once it grows past this many bytes. `None`
    /// disables size-triggered compaction.
    pub compact_after_bytes: Option<u64>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            sync: SyncPolicy::default(),
            compact_after_bytes: Some(64 * 1024 * 1024), // 64 MiB
        }
    }
}
