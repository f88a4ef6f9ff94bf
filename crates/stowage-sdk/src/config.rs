use serde::{Deserialize, Serialize};

use stowage_log::{LogConfig, SyncPolicy};

/// Configuration for a persistent [`Stowage`](crate::stowage::Stowage)
/// instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StowageConfig {
    /// Whether each commit is fsynced before it is acknowledged.
    pub sync_every_commit: bool,
    /// Rewrite a log once it grows past this many bytes. `None`
    /// disables size-triggered compaction.
    pub compact_after_bytes: Option<u64>,
}

impl Default for StowageConfig {
    fn default() -> Self {
        Self {
            sync_every_commit: false,
            compact_after_bytes: LogConfig::default().compact_after_bytes,
        }
    }
}

impl StowageConfig {
    /// A configuration that fsyncs every commit before acknowledging
    /// it. Slowest, safest.
    pub fn durable() -> Self {
        Self {
            sync_every_commit: true,
            ..Default::default()
        }
    }

    /// The record log configuration this selects.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            sync: if self.sync_every_commit {
                SyncPolicy::EveryCommit
            } else {
                SyncPolicy::OsBuffered
            },
            compact_after_bytes: self.compact_after_bytes,
        }
    }
}
