//! In-memory content store for testing and ephemeral use.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;

use stowage_types::{CommitResult, StorageError, StorageResult};

use crate::mutation::ContentMutation;
use crate::traits::ContentStore;

/// An in-memory implementation of [`ContentStore`].
///
/// All data lives in a `HashMap` behind a `RwLock` and is lost when the
/// store is dropped. Blobs are cloned on read, which is cheap: values
/// are [`Bytes`] and clones share the underlying buffer.
pub struct InMemoryContentStore {
    state: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryContentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContentStore {
    fn try_commit(&self, mutation: &ContentMutation) -> StorageResult<()> {
        let mut state = self.state.write().map_err(|_| StorageError::LockPoisoned)?;
        mutation.apply_to(&mut state);
        Ok(())
    }
}

impl ContentStore for InMemoryContentStore {
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

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self.state.read().map(|state| state.len()).unwrap_or(0);
        f.debug_struct("InMemoryContentStore")
            .field("keys", &keys)
            .finish()
    }
}
