//! Batched mutations against a content store.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single operation within a [`ContentMutation`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentOp {
    /// Insert or replace the blob stored under a key.
    Upsert { key: String, value: Bytes },
    /// Remove a key. Removing an absent key is a no-op.
    Delete { key: String },
    /// Remove every key that starts with the given prefix.
    DeleteByPrefix { prefix: String },
    /// Remove every key in the store.
    DeleteAll,
}

/// An ordered batch of operations applied atomically.
///
/// Operations take effect in the order they were added, so a later
/// operation sees the effect of an earlier one. A store applies the
/// whole batch or none of it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMutation {
    ops: Vec<ContentOp>,
}

impl ContentMutation {
    /// Start building a mutation.
    pub fn builder() -> ContentMutationBuilder {
        ContentMutationBuilder::default()
    }

    /// The operations in application order.
    pub fn ops(&self) -> &[ContentOp] {
        &self.ops
    }

    /// Returns `true` if the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations in the batch.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Apply every operation, in order, to a key/blob map.
    ///
    /// This is the single definition of mutation semantics; every
    /// engine funnels through it, both on commit and on log replay.
    pub fn apply_to(&self, state: &mut HashMap<String, Bytes>) {
        for op in &self.ops {
            match op {
                ContentOp::Upsert { key, value } => {
                    state.insert(key.clone(), value.clone());
                }
                ContentOp::Delete { key } => {
                    state.remove(key);
                }
                ContentOp::DeleteByPrefix { prefix } => {
                    state.retain(|key, _| !key.starts_with(prefix));
                }
                ContentOp::DeleteAll => {
                    state.clear();
                }
            }
        }
    }
}

/// Fluent builder for [`ContentMutation`].
#[derive(Debug, Default)]
pub struct ContentMutationBuilder {
    ops: Vec<ContentOp>,
}

impl ContentMutationBuilder {
    /// Insert or replace the blob stored under `key`.
    pub fn upsert(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.ops.push(ContentOp::Upsert {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Remove `key` if present.
    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.ops.push(ContentOp::Delete { key: key.into() });
        self
    }

    /// Remove every key starting with `prefix`.
    pub fn delete_by_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ops.push(ContentOp::DeleteByPrefix {
            prefix: prefix.into(),
        });
        self
    }

    /// Remove every key in the store.
    pub fn delete_all(mut self) -> Self {
        self.ops.push(ContentOp::DeleteAll);
        self
    }

    /// Finish the batch.
    pub fn build(self) -> ContentMutation {
        ContentMutation { ops: self.ops }
    }
}
