use bytes::Bytes;

use stowage_types::{CommitResult, StorageResult};

use crate::mutation::JournalMutation;

/// Named append-only journal store.
///
/// All implementations must satisfy these invariants:
/// - Commits are atomic: a mutation is applied in full or not at all,
///   and the [`CommitResult`] reports which.
/// - Operations within one mutation apply in order; a copy sees the
///   appends that precede it in the same batch.
/// - A journal exists exactly while it holds at least one entry, and
///   `read`, `exists`, and `all_journals` agree on that at all times.
/// - A journal that does not exist reads as an empty entry list, never
///   as an error.
/// - `all_journals` returns names in ascending lexicographic order.
pub trait JournalStore: Send + Sync {
    /// Apply a batched mutation atomically.
    fn commit(&self, mutation: &JournalMutation) -> CommitResult;

    /// All entries of the named journal, oldest first.
    fn read(&self, journal: &str) -> StorageResult<Vec<Bytes>>;

    /// Whether the named journal currently exists.
    fn exists(&self, journal: &str) -> StorageResult<bool>;

    /// Names of every journal in the store, in ascending order.
    fn all_journals(&self) -> StorageResult<Vec<String>>;

    /// Remove every journal in one atomic step.
    fn delete_all(&self) -> CommitResult;
}
