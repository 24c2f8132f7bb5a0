//! Pending-initializer queue evaluation
//!
//! An object's `metadata.initializers.pending` list is an ordered queue of
//! initializer entries. Whoever wrote the queue decided the order; this
//! module only ever looks at the head and drops it, and passes every other
//! entry through untouched (including entries it cannot interpret).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered queue of pending initializer entries, head first
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingQueue(Vec<Value>);

impl PendingQueue {
    /// Wrap raw queue entries exactly as they appear on the object
    pub fn new(entries: Vec<Value>) -> Self {
        Self(entries)
    }

    /// Build a well-formed queue from initializer names, head first
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            names
                .into_iter()
                .map(|n| serde_json::json!({ "name": n.into() }))
                .collect(),
        )
    }

    /// Whether no initializer is pending
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Name of the head entry, or `None` when the queue is empty or the head
    /// is not a record with a string `name`
    pub fn head_name(&self) -> Option<&str> {
        self.0.first()?.as_object()?.get("name")?.as_str()
    }

    /// Raw entries, head first
    pub fn entries(&self) -> &[Value] {
        &self.0
    }

    /// Consume the queue, returning its raw entries
    pub fn into_entries(self) -> Vec<Value> {
        self.0
    }
}

/// Metadata change to apply after an initializer step succeeds
#[derive(Clone, Debug, PartialEq)]
pub enum QueueUpdate {
    /// Remove the whole `metadata.initializers` block.
    ///
    /// The API server rejects `pending: []`, so an exhausted queue is
    /// expressed by deleting the block rather than emptying the list.
    ClearField,
    /// Replace `metadata.initializers.pending` with the remaining entries
    SetQueue(PendingQueue),
}

/// Whether `initializer_name` is at the head of the queue
///
/// A malformed head entry makes the object ineligible; it is not an error.
pub fn is_eligible(queue: &PendingQueue, initializer_name: &str) -> bool {
    queue.head_name() == Some(initializer_name)
}

/// Queue state after the head initializer has finished
pub fn next_queue_state(queue: &PendingQueue) -> QueueUpdate {
    match queue.entries().split_first() {
        Some((_, rest)) if !rest.is_empty() => QueueUpdate::SetQueue(PendingQueue(rest.to_vec())),
        _ => QueueUpdate::ClearField,
    }
}
