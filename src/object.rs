//! Unstructured view of an arbitrary Kubernetes object
//!
//! Objects of any kind flow through the controller as raw JSON so that
//! fields unknown to the typed API (notably `metadata.initializers`) survive
//! the list → hook → update round trip untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::queue::{PendingQueue, QueueUpdate};
use crate::Error;

const METADATA: &str = "metadata";
const INITIALIZERS: &str = "initializers";
const PENDING: &str = "pending";
const RESULT: &str = "result";

/// A cluster object being considered for initialization
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateObject(Value);

impl CandidateObject {
    /// Wrap a raw object
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The raw object
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume the wrapper, returning the raw object
    pub fn into_value(self) -> Value {
        self.0
    }

    /// `kind`, or empty when absent
    pub fn kind(&self) -> &str {
        self.0.get("kind").and_then(Value::as_str).unwrap_or_default()
    }

    /// `metadata.namespace`, or empty for cluster-scoped objects
    pub fn namespace(&self) -> &str {
        self.metadata_str("namespace")
    }

    /// `metadata.name`, or empty when absent
    pub fn name(&self) -> &str {
        self.metadata_str("name")
    }

    /// The pending initializer queue, empty when the object is initialized
    ///
    /// A `pending` field that is not a list is treated as an empty queue.
    pub fn pending_queue(&self) -> PendingQueue {
        self.initializers()
            .and_then(|i| i.get(PENDING))
            .and_then(Value::as_array)
            .map(|entries| PendingQueue::new(entries.clone()))
            .unwrap_or_default()
    }

    /// Whether any initializer is still pending
    pub fn is_uninitialized(&self) -> bool {
        !self.pending_queue().is_empty()
    }

    /// `metadata.initializers.result`, if an initializer attached one
    pub fn result(&self) -> Option<&Value> {
        self.initializers().and_then(|i| i.get(RESULT))
    }

    /// Apply the queue change computed after an initializer step
    pub fn apply_queue_update(&mut self, update: QueueUpdate) -> Result<(), Error> {
        match update {
            QueueUpdate::ClearField => {
                if let Some(metadata) = self.0.get_mut(METADATA).and_then(Value::as_object_mut) {
                    metadata.remove(INITIALIZERS);
                }
            }
            QueueUpdate::SetQueue(queue) => {
                self.initializers_mut()?
                    .insert(PENDING.to_string(), Value::Array(queue.into_entries()));
            }
        }
        Ok(())
    }

    /// Attach an initializer result to `metadata.initializers.result`
    pub fn set_result(&mut self, result: Value) -> Result<(), Error> {
        self.initializers_mut()?.insert(RESULT.to_string(), result);
        Ok(())
    }

    fn metadata_str(&self, field: &str) -> &str {
        self.0
            .get(METADATA)
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn initializers(&self) -> Option<&Map<String, Value>> {
        self.0.get(METADATA)?.get(INITIALIZERS)?.as_object()
    }

    /// `metadata.initializers` as a map, creating (or replacing non-map)
    /// intermediate fields on the way
    fn initializers_mut(&mut self) -> Result<&mut Map<String, Value>, Error> {
        let root = self
            .0
            .as_object_mut()
            .ok_or_else(|| Error::serialization("object is not a JSON map"))?;
        let metadata = child_map(root, METADATA)?;
        child_map(metadata, INITIALIZERS)
    }
}

impl From<Value> for CandidateObject {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn child_map<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Map<String, Value>, Error> {
    if !matches!(parent.get(key), Some(Value::Object(_))) {
        parent.insert(key.to_string(), Value::Object(Map::new()));
    }
    parent
        .get_mut(key)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| Error::serialization(format!("can't set nested field {key}")))
}
