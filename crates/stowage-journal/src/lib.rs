//! Append-only journal storage for stowage.
//!
//! A journal is a named sequence of opaque byte entries that only ever
//! grows at the tail. Writes go through [`JournalMutation`], an ordered
//! batch of appends, copies, and deletes against one journal, applied
//! atomically. A journal exists exactly while it holds at least one
//! entry, and a journal that does not exist reads as empty.
//!
//! [`InMemoryJournalStore`] and [`LogJournalStore`] implement the
//! [`JournalStore`] trait; [`BackgroundJournalStore`] adapts either to
//! the async [`AsyncJournalStore`] surface.

pub mod background;
pub mod log;
pub mod memory;
pub mod mutation;
pub mod traits;

pub use background::{AsyncJournalStore, BackgroundJournalStore};
pub use log::LogJournalStore;
pub use memory::InMemoryJournalStore;
pub use mutation::{JournalMutation, JournalMutationBuilder, JournalOp};
pub use traits::JournalStore;
