//! The terminal outcome of committing a batched mutation.

use crate::error::{StorageError, StorageResult};

/// Result of applying a batched mutation against a store.
///
/// Commits are atomic: `Success` means every operation in the batch was
/// applied, `Failure` means none were and carries the error that stopped
/// the commit. There is no partial outcome.
#[must_use = "a commit may have failed; check or propagate the outcome"]
#[derive(Debug)]
pub enum CommitResult {
    /// Every operation in the mutation took effect.
    Success,
    /// No operation took effect; the error explains why.
    Failure(StorageError),
}

impl CommitResult {
    /// Returns true if the mutation was applied in full.
    pub fn is_success(&self) -> bool {
        matches!(self, CommitResult::Success)
    }

    /// Returns true if the mutation was rejected in full.
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// The error behind a failed commit, if any.
    pub fn failure(&self) -> Option<&StorageError> {
        match self {
            CommitResult::Success => None,
            CommitResult::Failure(err) => Some(err),
        }
    }

    /// Converts the outcome into a plain `Result` for `?`-style callers.
    pub fn into_result(self) -> StorageResult<()> {
        match self {
            CommitResult::Success => Ok(()),
            CommitResult::Failure(err) => Err(err),
        }
    }
}

impl From<StorageResult<()>> for CommitResult {
    fn from(res: StorageResult<()>) -> Self {
        match res {
            Ok(()) => CommitResult::Success,
            Err(err) => CommitResult::Failure(err),
        }
    }
}
