//! Keyed blob storage for stowage.
//!
//! A content store maps string keys to opaque byte blobs. Writes go
//! through [`ContentMutation`], an ordered batch of operations applied
//! atomically; reads are point lookups, prefix scans, and full key
//! enumeration. Two engines implement the [`ContentStore`] trait:
//! [`InMemoryContentStore`] for tests and ephemeral use, and
//! [`LogContentStore`], which persists every committed mutation to a
//! record log and replays it on open. [`BackgroundContentStore`] wraps
//! either engine behind the async [`AsyncContentStore`] surface.

pub mod background;
pub mod log;
pub mod memory;
pub mod mutation;
pub mod traits;

pub use background::{AsyncContentStore, BackgroundContentStore};
pub use log::LogContentStore;
pub use memory::InMemoryContentStore;
pub use mutation::{ContentMutation, ContentMutationBuilder, ContentOp};
pub use traits::ContentStore;
