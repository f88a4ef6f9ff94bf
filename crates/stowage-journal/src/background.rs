//! Async adapter over any blocking [`JournalStore`].
//!
//! [`BackgroundJournalStore`] runs each call on the tokio blocking
//! pool. The async surface is behaviorally identical to the blocking
//! one, and every call resolves exactly once: even if the store panics
//! mid-operation, the caller gets a terminal failure rather than a
//! future that never completes.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use stowage_types::{CommitResult, StorageError, StorageResult};

use crate::mutation::JournalMutation;
use crate::traits::JournalStore;

/// Async surface of a journal store.
#[async_trait]
pub trait AsyncJournalStore: Send + Sync {
    /// Apply a batched mutation atomically.
    async fn commit(&self, mutation: JournalMutation) -> CommitResult;

    /// All entries of the named journal, oldest first; a missing
    /// journal reads as empty.
    async fn read(&self, journal: String) -> StorageResult<Vec<Bytes>>;

    /// Whether the named journal currently exists.
    async fn exists(&self, journal: String) -> StorageResult<bool>;

    /// Names of every journal in the store, in ascending order.
    async fn all_journals(&self) -> StorageResult<Vec<String>>;

    /// Remove every journal in one atomic step.
    async fn delete_all(&self) -> CommitResult;
}

/// Runs a blocking [`JournalStore`] on the tokio blocking pool.
#[derive(Clone)]
pub struct BackgroundJournalStore {
    inner: Arc<dyn JournalStore>,
}

impl BackgroundJournalStore {
    /// Wrap a store for async callers.
    pub fn new(inner: Arc<dyn JournalStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AsyncJournalStore for BackgroundJournalStore {
    async fn commit(&self, mutation: JournalMutation) -> CommitResult {
        let inner = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || inner.commit(&mutation)).await {
            Ok(result) => result,
            Err(err) => CommitResult::Failure(StorageError::Task(err.to_string())),
        }
    }

    async fn read(&self, journal: String) -> StorageResult<Vec<Bytes>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.read(&journal))
            .await
            .map_err(|err| StorageError::Task(err.to_string()))?
    }

    async fn exists(&self, journal: String) -> StorageResult<bool> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.exists(&journal))
            .await
            .map_err(|err| StorageError::Task(err.to_string()))?
    }

    async fn all_journals(&self) -> StorageResult<Vec<String>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.all_journals())
            .await
            .map_err(|err| StorageError::Task(err.to_string()))?
    }

    async fn delete_all(&self) -> CommitResult {
        let inner = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || inner.delete_all()).await {
            Ok(result) => result,
            Err(err) => CommitResult::Failure(StorageError::Task(err.to_string())),
        }
    }
}

impl std::fmt::Debug for BackgroundJournalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundJournalStore").finish_non_exhaustive()
    }
}
