//! High-level entry point for stowage.
//!
//! [`Stowage`] bundles the two storage surfaces behind one handle: a
//! keyed blob store for content and a named append-only journal store.
//! Both can live purely in memory or persist to a directory of record
//! logs, and both are also reachable through async adapters that run on
//! the tokio blocking pool. This is the crate applications embed.

pub mod config;
pub mod stowage;

pub use config::StowageConfig;
pub use stowage::Stowage;

// Re-export key types
pub use stowage_content::{
    AsyncContentStore, BackgroundContentStore, ContentMutation, ContentStore,
};
pub use stowage_journal::{
    AsyncJournalStore, BackgroundJournalStore, JournalMutation, JournalStore,
};
pub use stowage_types::{CommitResult, StorageError, StorageResult};
