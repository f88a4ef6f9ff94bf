use std::path::Path;
use std::sync::Arc;

use stowage_content::{
    BackgroundContentStore, ContentStore, InMemoryContentStore, LogContentStore,
};
use stowage_journal::{
    BackgroundJournalStore, InMemoryJournalStore, JournalStore, LogJournalStore,
};
use stowage_types::StorageResult;

use crate::config::StowageConfig;

/// File name of the content log inside a stowage directory.
const CONTENT_LOG_FILE: &str = "content.log";
/// File name of the journal log inside a stowage directory.
const JOURNAL_LOG_FILE: &str = "journal.log";

/// High-level storage API bundling a content store and a journal store.
///
/// The two stores are independent surfaces over separate state: content
/// keys and journal names never collide. Persistent instances keep one
/// record log per store inside the directory they were opened on.
pub struct Stowage {
    content: Arc<dyn ContentStore>,
    journal: Arc<dyn JournalStore>,
}

impl Stowage {
    /// Open persistent stores under the given directory with the
    /// default configuration.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        Self::open_with(dir, StowageConfig::default())
    }

    /// Open persistent stores under the given directory.
    pub fn open_with(dir: &Path, config: StowageConfig) -> StorageResult<Self> {
        let log_config = config.log_config();
        let content = LogContentStore::open(&dir.join(CONTENT_LOG_FILE), log_config.clone())?;
        let journal = LogJournalStore::open(&dir.join(JOURNAL_LOG_FILE), log_config)?;
        Ok(Self {
            content: Arc::new(content),
            journal: Arc::new(journal),
        })
    }

    /// Ephemeral stores holding everything in memory.
    pub fn in_memory() -> Self {
        Self {
            content: Arc::new(InMemoryContentStore::new()),
            journal: Arc::new(InMemoryJournalStore::new()),
        }
    }

    // ---- Accessors ----

    /// The content store.
    pub fn content(&self) -> &dyn ContentStore {
        self.content.as_ref()
    }

    /// The journal store.
    pub fn journal(&self) -> &dyn JournalStore {
        self.journal.as_ref()
    }

    /// A shared handle to the content store.
    pub fn content_handle(&self) -> Arc<dyn ContentStore> {
        Arc::clone(&self.content)
    }

    /// A shared handle to the journal store.
    pub fn journal_handle(&self) -> Arc<dyn JournalStore> {
        Arc::clone(&self.journal)
    }

    // ---- Async adapters ----

    /// The content store behind its async surface.
    pub fn background_content(&self) -> BackgroundContentStore {
        BackgroundContentStore::new(self.content_handle())
    }

    /// The journal store behind its async surface.
    pub fn background_journal(&self) -> BackgroundJournalStore {
        BackgroundJournalStore::new(self.journal_handle())
    }
}

impl std::fmt::Debug for Stowage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stowage").finish_non_exhaustive()
    }
}
