//! In-memory journal store for testing and ephemeral use.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;

use stowage_types::{CommitResult, StorageError, StorageResult};

use crate::mutation::JournalMutation;
use crate::traits::JournalStore;

/// An in-memory implementation of [`JournalStore`].
///
/// All journals live in a `HashMap` behind a `RwLock` and are lost when
/// the store is dropped.
pub struct InMemoryJournalStore {
    state: RwLock<HashMap<String, Vec<Bytes>>>,
}

impl InMemoryJournalStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    fn try_commit(&self, mutation: &JournalMutation) -> StorageResult<()> {
        let mut state = self.state.write().map_err(|_| StorageError::LockPoisoned)?;
        mutation.apply_to(&mut state);
        Ok(())
    }

    fn try_delete_all(&self) -> StorageResult<()> {
        let mut state = self.state.write().map_err(|_| StorageError::LockPoisoned)?;
        state.clear();
        Ok(())
    }
}

impl Default for InMemoryJournalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JournalStore for InMemoryJournalStore {
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

impl std::fmt::Debug for InMemoryJournalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let journals = self.state.read().map(|state| state.len()).unwrap_or(0);
        f.debug_struct("InMemoryJournalStore")
            .field("journals", &journals)
            .finish()
    }
}
