//! Batched mutations against a single journal.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single operation within a [`JournalMutation`].
///
/// Every operation acts on the journal the mutation was built for;
/// `Copy` additionally names a destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalOp {
    /// Append one entry to the tail of the journal. A zero-length
    /// entry is valid and is preserved as such.
    Append(Bytes),
    /// Make the journal named `to` an exact copy of this journal as it
    /// stands at this point in the batch. If this journal does not
    /// exist, `to` does not exist afterwards either.
    Copy { to: String },
    /// Remove the journal and all its entries. Removing an absent
    /// journal is a no-op.
    Delete,
}

/// An ordered batch of operations against one named journal, applied
/// atomically.
///
/// Operations take effect in order: an entry appended earlier in the
/// batch is visible to a `Copy` later in the same batch. A store
/// applies the whole batch or none of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalMutation {
    journal: String,
    ops: Vec<JournalOp>,
}

impl JournalMutation {
    /// Start building a mutation against the named journal.
    pub fn builder(journal: impl Into<String>) -> JournalMutationBuilder {
        JournalMutationBuilder {
            journal: journal.into(),
            ops: Vec::new(),
        }
    }

    /// The journal this mutation targets.
    pub fn journal(&self) -> &str {
        &self.journal
    }

    /// The operations in application order.
    pub fn ops(&self) -> &[JournalOp] {
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

    /// Apply every operation, in order, to a map of journal entries.
    ///
    /// This is the single definition of mutation semantics; every
    /// engine funnels through it, both on commit and on log replay.
    /// The map never holds an empty entry list: a journal exists
    /// exactly while it has at least one entry.
    pub fn apply_to(&self, state: &mut HashMap<String, Vec<Bytes>>) {
        for op in &self.ops {
            match op {
                JournalOp::Append(entry) => {
                    state
                        .entry(self.journal.clone())
                        .or_default()
                        .push(entry.clone());
                }
                JournalOp::Copy { to } => match state.get(&self.journal).cloned() {
                    Some(entries) => {
                        state.insert(to.clone(), entries);
                    }
                    None => {
                        state.remove(to);
                    }
                },
                JournalOp::Delete => {
                    state.remove(&self.journal);
                }
            }
        }
    }
}

/// Fluent builder for [`JournalMutation`].
#[derive(Debug)]
pub struct JournalMutationBuilder {
    journal: String,
    ops: Vec<JournalOp>,
}

impl JournalMutationBuilder {
    /// Append one entry to the journal's tail.
    pub fn append(mut self, entry: impl Into<Bytes>) -> Self {
        self.ops.push(JournalOp::Append(entry.into()));
        self
    }

    /// Copy the journal, as it stands at this point in the batch, to
    /// the journal named `to`.
    pub fn copy_to(mut self, to: impl Into<String>) -> Self {
        self.ops.push(JournalOp::Copy { to: to.into() });
        self
    }

    /// Remove the journal and all its entries.
    pub fn delete(mut self) -> Self {
        self.ops.push(JournalOp::Delete);
        self
    }

    /// Finish the batch.
    pub fn build(self) -> JournalMutation {
        JournalMutation {
            journal: self.journal,
            ops: self.ops,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(state: &HashMap<String, Vec<Bytes>>, journal: &str) -> Vec<Bytes> {
        state.get(journal).cloned().unwrap_or_default()
    }

    #[test]
    fn append_creates_the_journal() {
        let mut state = HashMap::new();
        JournalMutation::builder("log")
            .append(&b"first"[..])
            .append(&b"second"[..])
            .build()
            .apply_to(&mut state);

        assert_eq!(
            entries(&state, "log"),
            vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")]
        );
    }

    #[test]
    fn zero_length_entries_are_preserved() {
        let mut state = HashMap::new();
        JournalMutation::builder("log")
            .append(&b""[..])
            .build()
            .apply_to(&mut state);

        assert_eq!(entries(&state, "log"), vec![Bytes::new()]);
        assert!(state.contains_key("log"));
    }

    #[test]
    fn copy_sees_appends_earlier_in_the_batch() {
        let mut state = HashMap::new();
        JournalMutation::builder("src")
            .append(&b"one"[..])
            .copy_to("dst")
            .append(&b"two"[..])
            .build()
            .apply_to(&mut state);

        // The copy snapshotted "src" before the second append.
        assert_eq!(entries(&state, "dst"), vec![Bytes::from_static(b"one")]);
        assert_eq!(entries(&state, "src").len(), 2);
    }

    #[test]
    fn copy_overwrites_the_destination() {
        let mut state = HashMap::new();
        state.insert("dst".to_string(), vec![Bytes::from_static(b"stale")]);

        JournalMutation::builder("src")
            .append(&b"fresh"[..])
            .copy_to("dst")
            .build()
            .apply_to(&mut state);

        assert_eq!(entries(&state, "dst"), vec![Bytes::from_static(b"fresh")]);
    }

    #[test]
    fn copy_of_missing_journal_clears_the_destination() {
        let mut state = HashMap::new();
        state.insert("dst".to_string(), vec![Bytes::from_static(b"stale")]);

        JournalMutation::builder("never-written")
            .copy_to("dst")
            .build()
            .apply_to(&mut state);

        // The destination mirrors the source exactly, absence included.
        assert!(!state.contains_key("dst"));
    }

    #[test]
    fn copy_onto_itself_is_a_noop() {
        let mut state = HashMap::new();
        state.insert("log".to_string(), vec![Bytes::from_static(b"e")]);

        JournalMutation::builder("log")
            .copy_to("log")
            .build()
            .apply_to(&mut state);

        assert_eq!(entries(&state, "log"), vec![Bytes::from_static(b"e")]);
    }

    #[test]
    fn delete_removes_the_journal() {
        let mut state = HashMap::new();
        state.insert("log".to_string(), vec![Bytes::from_static(b"e")]);

        JournalMutation::builder("log").delete().build().apply_to(&mut state);
        assert!(!state.contains_key("log"));

        // Deleting again is a no-op.
        JournalMutation::builder("log").delete().build().apply_to(&mut state);
        assert!(state.is_empty());
    }

    #[test]
    fn delete_then_append_restarts_the_journal() {
        let mut state = HashMap::new();
        state.insert("log".to_string(), vec![Bytes::from_static(b"old")]);

        JournalMutation::builder("log")
            .delete()
            .append(&b"new"[..])
            .build()
            .apply_to(&mut state);

        assert_eq!(entries(&state, "log"), vec![Bytes::from_static(b"new")]);
    }

    #[test]
    fn state_never_holds_an_empty_journal() {
        let mut state = HashMap::new();
        JournalMutation::builder("a")
            .append(&b"1"[..])
            .copy_to("b")
            .delete()
            .build()
            .apply_to(&mut state);

        for entries in state.values() {
            assert!(!entries.is_empty());
        }
        assert!(state.contains_key("b"));
        assert!(!state.contains_key("a"));
    }

    #[test]
    fn mutation_encoding_round_trips() {
        let mutation = JournalMutation::builder("journal/1")
            .append(&b"entry"[..])
            .copy_to("journal/2")
            .delete()
            .build();

        let encoded = bincode::serialize(&mutation).unwrap();
        let decoded: JournalMutation = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, mutation);
    }
}
