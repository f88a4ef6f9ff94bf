use std::collections::HashMap;

use bytes::Bytes;

use stowage_types::{CommitResult, StorageResult};

use crate::mutation::ContentMutation;

/// Keyed blob store.
///
/// All implementations must satisfy these invariants:
/// - Commits are atomic: a mutation is applied in full or not at all,
///   and the [`CommitResult`] reports which.
/// - Operations within one mutation apply in order; later operations
///   see the effect of earlier ones.
/// - Missing keys are not errors. Point reads simply omit them from
///   the result.
/// - Reads observe a consistent state, never a half-applied mutation.
/// - Enumerating reads return keys in ascending lexicographic order.
pub trait ContentStore: Send + Sync {
    /// Apply a batched mutation atomically.
    fn commit(&self, mutation: &ContentMutation) -> CommitResult;

    /// Fetch the blobs stored under the given keys.
    ///
    /// Keys with no stored blob are absent from the returned map.
    fn get(&self, keys: &[String]) -> StorageResult<HashMap<String, Bytes>>;

    /// Fetch every key/blob pair whose key starts with `prefix`, in
    /// ascending key order.
    ///
    /// Prefix matching is plain string comparison with no delimiter
    /// handling: the key `"key 0"` matches the prefix `"key"`. An empty
    /// prefix returns the whole store.
    fn get_all(&self, prefix: &str) -> StorageResult<Vec<(String, Bytes)>>;

    /// Every key in the store, in ascending order.
    fn all_keys(&self) -> StorageResult<Vec<String>>;
}
