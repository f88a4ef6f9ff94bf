//! Foundation types shared by every stowage crate.
//!
//! Two pieces live here: [`StorageError`] is the single error vocabulary
//! used by content and journal stores alike, and [`CommitResult`] is the
//! terminal outcome of a batched mutation. Keeping them in one crate lets
//! the store traits, the persistent engines, and the async adapters all
//! speak the same types without depending on each other.

pub mod commit;
pub mod error;

pub use commit::CommitResult;
pub use error::{StorageError, StorageResult};
