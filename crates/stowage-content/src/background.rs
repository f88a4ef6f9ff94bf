//! Async adapter over any blocking [`ContentStore`].
//!
//! [`BackgroundContentStore`] runs each call on the tokio blocking
//! pool. The async surface is behaviorally identical to the blocking
//! one, and every call resolves exactly once: even if the store panics
//! mid-operation, the caller gets a terminal failure rather than a
//! future that never completes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use stowage_types::{CommitResult, StorageError, StorageResult};

use crate::mutation::ContentMutation;
use crate::traits::ContentStore;

/// Async surface of a content store.
#[async_trait]
pub trait AsyncContentStore: Send + Sync {
    /// Apply a batched mutation atomically.
    async fn commit(&self, mutation: ContentMutation) -> CommitResult;

    /// Fetch the blobs stored under the given keys; missing keys are
    /// absent from the result.
    async fn get(&self, keys: Vec<String>) -> StorageResult<HashMap<String, Bytes>>;

    /// Fetch every key/blob pair whose key starts with `prefix`.
    async fn get_all(&self, prefix: String) -> StorageResult<Vec<(String, Bytes)>>;

    /// Every key in the store, in ascending order.
    async fn all_keys(&self) -> StorageResult<Vec<String>>;
}

/// Runs a blocking [`ContentStore`] on the tokio blocking pool.
#[derive(Clone)]
pub struct BackgroundContentStore {
    inner: Arc<dyn ContentStore>,
}

impl BackgroundContentStore {
    /// Wrap a store for async callers.
    pub fn new(inner: Arc<dyn ContentStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AsyncContentStore for BackgroundContentStore {
    async fn commit(&self, mutation: ContentMutation) -> CommitResult {
        let inner = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || inner.commit(&mutation)).await {
            Ok(result) => result,
            Err(err) => CommitResult::Failure(StorageError::Task(err.to_string())),
        }
    }

    async fn get(&self, keys: Vec<String>) -> StorageResult<HashMap<String, Bytes>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.get(&keys))
            .await
            .map_err(|err| StorageError::Task(err.to_string()))?
    }

    async fn get_all(&self, prefix: String) -> StorageResult<Vec<(String, Bytes)>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.get_all(&prefix))
            .await
            .map_err(|err| StorageError::Task(err.to_string()))?
    }

    async fn all_keys(&self) -> StorageResult<Vec<String>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.all_keys())
            .await
            .map_err(|err| StorageError::Task(err.to_string()))?
    }
}

impl std::fmt::Debug for BackgroundContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundContentStore").finish_non_exhaustive()
    }
}
