//! Log-backed content store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use bytes::Bytes;
use tracing::{debug, warn};

use stowage_log::{LogConfig, RecordLog};
use stowage_types::{CommitResult, StorageError, StorageResult};

use crate::mutation::ContentMutation;
use crate::traits::ContentStore;

/// A content store that persists every committed mutation to a
/// [`RecordLog`] and keeps the materialized state in memory.
///
/// Opening the store replays the log front-to-back, so state survives
/// process restarts. A mutation is appended to the log before it
/// touches the in-memory map; if the append fails the map is left
/// untouched and the commit reports failure.
pub struct LogContentStore {
    state: RwLock<HashMap<String, Bytes>>,
    log: RecordLog,
    compact_after_bytes: Option<u64>,
}

impl LogContentStore {
    /// Open (or create) a log-backed store at the given path.
    pub fn open(path: &Path, config: LogConfig) -> StorageResult<Self> {
        let compact_after_bytes = config.compact_after_bytes;
        let log = RecordLog::open(path, config)?;

        let mut state = HashMap::new();
        let records = log.replay()?;
        let mutations = records.len();
        for record in &records {
            let mutation: ContentMutation = bincode::deserialize(record)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            mutation.apply_to(&mut state);
        }

        debug!(mutations, keys = state.len(), "content store opened");
        Ok(Self {
            state: RwLock::new(state),
            log,
            compact_after_bytes,
        })
    }

    /// Rewrite the log so it holds exactly one mutation that rebuilds
    /// the current state.
    ///
    /// Runs automatically once the log outgrows the configured
    /// threshold, but may also be called directly.
    pub fn compact(&self) -> StorageResult<()> {
        // Hold the write lock so no commit can slip between reading the
        // snapshot and installing the rewritten log.
        let state = self.state.write().map_err(|_| StorageError::LockPoisoned)?;

        if state.is_empty() {
            self.log.rewrite(&[])?;
            debug!("content log compacted to empty");
            return Ok(());
        }

        let mut entries: Vec<(&String, &Bytes)> = state.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut builder = ContentMutation::builder().delete_all();
        for (key, value) in entries {
            builder = builder.upsert(key.clone(), value.clone());
        }
        let snapshot = builder.build();

        let record = bincode::serialize(&snapshot)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.log.rewrite(&[record])?;

        debug!(keys = state.len(), "content log compacted");
        Ok(())
    }

    fn try_commit(&self, mutation: &ContentMutation) -> StorageResult<()> {
        // A batch with no operations commits without growing the log.
        if mutation.is_empty() {
            return Ok(());
        }

        // Serialize outside the locks.
        let record = bincode::serialize(mutation)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut state = self.state.write().map_err(|_| StorageError::LockPoisoned)?;
        self.log.append(&record)?;
        mutation.apply_to(&mut state);
        drop(state);

        self.maybe_compact();
        Ok(())
    }

    /// Compact if the log has outgrown the configured threshold. A
    /// compaction failure is logged, never surfaced to the commit that
    /// triggered it.
    fn maybe_compact(&self) {
        let Some(threshold) = self.compact_after_bytes else {
            return;
        };
        match self.log.offset() {
            Ok(len) if len > threshold => {}
            Ok(_) => return,
            Err(err) => {
                warn!(error = %err, "skipping compaction check");
                return;
            }
        }
        if let Err(err) = self.compact() {
            warn!(error = %err, "content log compaction failed");
        }
    }
}

impl ContentStore for LogContentStore {
    fn commit(&self, mutation: &ContentMutation) -> CommitResult {
        self.try_commit(mutation).into()
    }

    fn get(&self, keys: &[String]) -> StorageResult<HashMap<String, Bytes>> {
        let state = self.state.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(keys
            .iter()
            .filter_map(|key| state.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    fn get_all(&self, prefix: &str) -> StorageResult<Vec<(String, Bytes)>> {
        let state = self.state.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut entries: Vec<(String, Bytes)> = state
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(entries)
    }

    fn all_keys(&self) -> StorageResult<Vec<String>> {
        let state = self.state.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut keys: Vec<String> = state.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl std::fmt::Debug for LogContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self.state.read().map(|state| state.len()).unwrap_or(0);
        f.debug_struct("LogContentStore")
            .field("path", &self.log.path())
            .field("keys", &keys)
            .finish()
    }
}
