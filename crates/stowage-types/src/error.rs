//! The shared error vocabulary for storage operations.

use thiserror::Error;

/// Errors surfaced by content and journal store implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An underlying I/O operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding a persisted record failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted log frame is present but unreadable.
    #[error("corrupt record at offset {offset}: {reason}")]
    Corrupt {
        /// Byte offset of the frame within the log file.
        offset: u64,
        /// What made the frame unreadable.
        reason: String,
    },

    /// A lock guarding shared state was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// A background task running a storage operation failed to complete.
    #[error("storage task failed: {0}")]
    Task(String),

    /// The store refused the operation because an earlier commit failed
    /// partway and the in-memory state may no longer match the log.
    #[error("store is wedged after a failed commit; reopen to recover")]
    Wedged,
}

/// Convenience alias used throughout the stowage crates.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
