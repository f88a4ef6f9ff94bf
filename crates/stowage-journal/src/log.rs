//! Log-backed journal store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use bytes::Bytes;
use tracing::{debug, warn};

use stowage_log::{LogConfig, RecordLog};
use stowage_types::{CommitResult, StorageError, StorageResult};

use crate::mutation::JournalMutation;
use crate::traits::JournalStore;

/// A journal store that persists every committed mutation to a
/// [`RecordLog`] and keeps the materialized journals in memory.
///
/// Opening the store replays the log front-to-back, so journals survive
/// process restarts. A mutation is appended to the log before it
/// touches the in-memory map; if the append fails the map is left
/// untouched and the commit reports failure. `delete_all` swaps in an
/// empty log instead of appending to it, reclaiming the space the
/// dropped journals held.
pub struct LogJournalStore {
    state: RwLock<HashMap<String, Vec<Bytes>>>,
    log: RecordLog,
    compact_after_bytes: Option<u64>,
}

impl LogJournalStore {
    /// Open (or create) a log-backed store at the given path.
    pub fn open(path: &Path, config: LogConfig) -> StorageResult<Self> {
        let compact_after_bytes = config.compact_after_bytes;
        let log = RecordLog::open(path, config)?;

        let mut state = HashMap::new();
        let records = log.replay()?;
        let mutations = records.len();
        for record in &records {
            let mutation: JournalMutation = bincode::deserialize(record)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            mutation.apply_to(&mut state);
        }

        debug!(mutations, journals = state.len(), "journal store opened");
        Ok(Self {
            state: RwLock::new(state),
            log,
            compact_after_bytes,
        })
    }

    /// Rewrite the log so it holds one append-only mutation per
    /// journal, dropping every superseded record.
    ///
    /// Runs automatically once the log outgrows the configured
    /// threshold, but may also be called directly.
    pub fn compact(&self) -> StorageResult<()> {
        // Hold the write lock so no commit can slip between reading the
        // snapshot and installing the rewritten log.
        let state = self.state.write().map_err(|_| StorageError::LockPoisoned)?;

        let mut journals: Vec<(&String, &Vec<Bytes>)> = state.iter().collect();
        journals.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut records = Vec::with_capacity(journals.len());
        for (name, entries) in journals {
            let mut builder = JournalMutation::builder(name.clone());
            for entry in entries {
                builder = builder.append(entry.clone());
            }
            let record = bincode::serialize(&builder.build())
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            records.push(record);
        }
        self.log.rewrite(&records)?;

        debug!(journals = state.len(), "journal log compacted");
        Ok(())
    }

    fn try_commit(&self, mutation: &JournalMutation) -> StorageResult<()> {
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

    fn try_delete_all(&self) -> StorageResult<()> {
        let mut state = self.state.write().map_err(|_| StorageError::LockPoisoned)?;
        // The empty rewrite installs a fresh log by rename; if it
        // fails, the file and the map both stay as they were.
        self.log.rewrite(&[])?;
        state.clear();
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
            warn!(error = %err, "journal log compaction failed");
        }
    }
}

impl JournalStore for LogJournalStore {
    fn commit(&self, mutation: &JournalMutation) -> CommitResult {
        self.try_commit(mutation).into()
    }

    fn read(&self, journal: &str) -> StorageResult<Vec<Bytes>> {
        let state = self.state.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(state.get(journal).cloned().unwrap_or_default())
    }

    fn exists(&self, journal: &str) -> StorageResult<bool> {
        let state = self.state.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(state.contains_key(journal))
    }

    fn all_journals(&self) -> StorageResult<Vec<String>> {
        let state = self.state.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut names: Vec<String> = state.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn delete_all(&self) -> CommitResult {
        self.try_delete_all().into()
    }
}

impl std::fmt::Debug for LogJournalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let journals = self.state.read().map(|state| state.len()).unwrap_or(0);
        f.debug_struct("LogJournalStore")
            .field("path", &self.log.path())
            .field("journals", &journals)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, OpenOptions};

    fn open_store(path: &Path) -> LogJournalStore {
        LogJournalStore::open(path, LogConfig::default()).unwrap()
    }

    fn append(store: &LogJournalStore, journal: &str, entry: &[u8]) {
        let result = store.commit(
            &JournalMutation::builder(journal)
                .append(Bytes::copy_from_slice(entry))
                .build(),
        );
        assert!(result.is_success());
    }

    #[test]
    fn commit_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir.path().join("journal.log"));

        append(&store, "sessions", b"one");
        append(&store, "sessions", b"two");

        assert_eq!(
            store.read("sessions").unwrap(),
            vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")]
        );
    }

    #[test]
    fn journals_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");

        let store = open_store(&path);
        append(&store, "kept", b"entry-1");
        append(&store, "kept", b"entry-2");
        append(&store, "dropped", b"x");
        store
            .commit(&JournalMutation::builder("dropped").delete().build())
            .into_result()
            .unwrap();
        drop(store);

        let store = open_store(&path);
        assert_eq!(store.all_journals().unwrap(), vec!["kept".to_string()]);
        assert_eq!(store.read("kept").unwrap().len(), 2);
        assert!(!store.exists("dropped").unwrap());
    }

    #[test]
    fn copy_snapshot_replays_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");

        let store = open_store(&path);
        let result = store.commit(
            &JournalMutation::builder("src")
                .append(&b"before"[..])
                .copy_to("dst")
                .append(&b"after"[..])
                .build(),
        );
        assert!(result.is_success());
        drop(store);

        let store = open_store(&path);
        assert_eq!(store.read("dst").unwrap(), vec![Bytes::from_static(b"before")]);
        assert_eq!(store.read("src").unwrap().len(), 2);
    }

    #[test]
    fn empty_mutation_does_not_grow_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");
        let store = open_store(&path);

        append(&store, "log", b"entry");
        let len_before = fs::metadata(&path).unwrap().len();

        let result = store.commit(&JournalMutation::builder("log").build());
        assert!(result.is_success());
        assert_eq!(fs::metadata(&path).unwrap().len(), len_before);
    }

    #[test]
    fn delete_all_empties_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");
        let store = open_store(&path);

        append(&store, "a", b"1");
        append(&store, "b", b"2");
        assert!(fs::metadata(&path).unwrap().len() > 0);

        let result = store.delete_all();
        assert!(result.is_success());
        assert!(store.all_journals().unwrap().is_empty());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        assert!(!path.with_extension("rewrite").exists());

        drop(store);
        let store = open_store(&path);
        assert!(store.all_journals().unwrap().is_empty());
    }

    #[test]
    fn appends_after_delete_all_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");

        let store = open_store(&path);
        append(&store, "old", b"x");
        store.delete_all().into_result().unwrap();
        append(&store, "new", b"y");
        drop(store);

        let store = open_store(&path);
        assert_eq!(store.all_journals().unwrap(), vec!["new".to_string()]);
    }

    #[test]
    fn torn_tail_drops_only_last_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");

        let store = open_store(&path);
        append(&store, "kept", b"entry");
        let keep_len = fs::metadata(&path).unwrap().len();
        append(&store, "torn", b"entry");
        let full_len = fs::metadata(&path).unwrap().len();
        drop(store);

        // Cut the second frame short, as a crash mid-write would.
        {
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(full_len - 3).unwrap();
        }

        let store = open_store(&path);
        assert_eq!(store.all_journals().unwrap(), vec!["kept".to_string()]);
        assert_eq!(fs::metadata(&path).unwrap().len(), keep_len);
    }

    #[test]
    fn compact_preserves_journals_and_shrinks_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");
        let store = open_store(&path);

        // Churn one journal so the log carries superseded records.
        for i in 0..25 {
            append(&store, "churn", format!("entry-{i}").as_bytes());
            store
                .commit(&JournalMutation::builder("churn").delete().build())
                .into_result()
                .unwrap();
        }
        append(&store, "churn", b"survivor");
        append(&store, "stable", b"fixed");
        let before = fs::metadata(&path).unwrap().len();

        store.compact().unwrap();
        assert!(fs::metadata(&path).unwrap().len() < before);

        assert_eq!(
            store.all_journals().unwrap(),
            vec!["churn".to_string(), "stable".to_string()]
        );
        assert_eq!(store.read("churn").unwrap(), vec![Bytes::from_static(b"survivor")]);
        drop(store);

        let store = open_store(&path);
        assert_eq!(store.read("stable").unwrap(), vec![Bytes::from_static(b"fixed")]);
    }

    #[test]
    fn compact_empty_store_truncates_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");
        let store = open_store(&path);

        append(&store, "gone", b"x");
        store
            .commit(&JournalMutation::builder("gone").delete().build())
            .into_result()
            .unwrap();
        store.compact().unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn threshold_triggers_automatic_compaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");
        let config = LogConfig {
            compact_after_bytes: Some(256),
            ..LogConfig::default()
        };
        let store = LogJournalStore::open(&path, config).unwrap();

        // Delete-then-append churn stays bounded on disk because the
        // log keeps collapsing to one record per live journal.
        for i in 0..50 {
            store
                .commit(
                    &JournalMutation::builder("churn")
                        .delete()
                        .append(format!("entry-{i}").into_bytes())
                        .build(),
                )
                .into_result()
                .unwrap();
        }

        let len = fs::metadata(&path).unwrap().len();
        assert!(len < 1024, "log was {len} bytes");
        assert_eq!(store.read("churn").unwrap(), vec![Bytes::from_static(b"entry-49")]);
    }

    #[test]
    fn concurrent_appends_all_persist() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.log");
        let store = Arc::new(open_store(&path));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..16 {
                        let result = store.commit(
                            &JournalMutation::builder(format!("journal/{t}"))
                                .append(format!("entry-{i}").into_bytes())
                                .build(),
                        );
                        assert!(result.is_success());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        drop(store);
        let store = open_store(&path);
        assert_eq!(store.all_journals().unwrap().len(), 4);
        for t in 0..4 {
            assert_eq!(store.read(&format!("journal/{t}")).unwrap().len(), 16);
        }
    }

    #[test]
    fn readers_never_observe_partial_batches() {
        use std::sync::Arc;
        use std::thread;

        // The writer flips one journal between two complete entry
        // sets, each installed by one atomic batch. Readers must only
        // ever see one of those sets, never a half-applied batch.
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(open_store(&dir.path().join("journal.log")));
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..100 {
                    let result = store.commit(
                        &JournalMutation::builder("flip")
                            .delete()
                            .append(&b"one"[..])
                            .append(&b"two"[..])
                            .build(),
                    );
                    assert!(result.is_success());
                    let result = store.commit(
                        &JournalMutation::builder("flip")
                            .delete()
                            .append(&b"solo"[..])
                            .build(),
                    );
                    assert!(result.is_success());
                }
            })
        };

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let entries = store.read("flip").unwrap();
                        let complete = entries.is_empty()
                            || entries
                                == [Bytes::from_static(b"one"), Bytes::from_static(b"two")]
                            || entries == [Bytes::from_static(b"solo")];
                        assert!(complete, "observed a partial batch: {entries:?}");
                    }
                })
            })
            .collect();

        writer.join().expect("writer should not panic");
        for h in readers {
            h.join().expect("reader should not panic");
        }
    }

    // -----------------------------------------------------------------------
    // Engine equivalence
    // -----------------------------------------------------------------------

    use crate::memory::InMemoryJournalStore;
    use crate::mutation::JournalOp;
    use proptest::prelude::*;

    fn arb_journal() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("alpha".to_string()),
            Just("beta".to_string()),
            Just("gamma".to_string()),
        ]
    }

    fn arb_op() -> impl Strategy<Value = JournalOp> {
        let entry = proptest::collection::vec(any::<u8>(), 0..6);
        prop_oneof![
            entry.prop_map(|bytes| JournalOp::Append(Bytes::from(bytes))),
            arb_journal().prop_map(|to| JournalOp::Copy { to }),
            Just(JournalOp::Delete),
        ]
    }

    fn arb_mutation() -> impl Strategy<Value = JournalMutation> {
        (arb_journal(), proptest::collection::vec(arb_op(), 0..4)).prop_map(
            |(journal, ops)| {
                ops.into_iter()
                    .fold(JournalMutation::builder(journal), |builder, op| match op {
                        JournalOp::Append(entry) => builder.append(entry),
                        JournalOp::Copy { to } => builder.copy_to(to),
                        JournalOp::Delete => builder.delete(),
                    })
                    .build()
            },
        )
    }

    proptest! {
        #[test]
        fn log_engine_matches_memory_engine(
            mutations in proptest::collection::vec(arb_mutation(), 1..12)
        ) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("journal.log");
            let log_store = open_store(&path);
            let mem_store = InMemoryJournalStore::new();

            for mutation in &mutations {
                prop_assert!(log_store.commit(mutation).is_success());
                prop_assert!(mem_store.commit(mutation).is_success());
            }
            prop_assert_eq!(
                log_store.all_journals().unwrap(),
                mem_store.all_journals().unwrap()
            );
            for journal in mem_store.all_journals().unwrap() {
                prop_assert_eq!(
                    log_store.read(&journal).unwrap(),
                    mem_store.read(&journal).unwrap()
                );
            }

            // The same journals must come back after a replay.
            drop(log_store);
            let reopened = open_store(&path);
            prop_assert_eq!(
                reopened.all_journals().unwrap(),
                mem_store.all_journals().unwrap()
            );
            for journal in mem_store.all_journals().unwrap() {
                prop_assert_eq!(
                    reopened.read(&journal).unwrap(),
                    mem_store.read(&journal).unwrap()
                );
            }
        }
    }
}
