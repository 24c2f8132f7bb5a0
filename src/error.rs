//! Error types for the initializer controller
//!
//! Every variant carries enough identity (resource, kind, namespace, name,
//! configuration) to diagnose a failure from the log line alone. Failures
//! from independent units of work are collected into an [`AggregateError`]
//! rather than returned early.

use std::fmt;

use thiserror::Error;

/// Main error type for initializer controller operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Objects or configurations could not be enumerated
    #[error("can't list {resource}: {message}")]
    ListFailure {
        /// The collection being listed (e.g. "pods.v1")
        resource: String,
        /// Description of what failed
        message: String,
    },

    /// A configuration record could not be decoded into its typed form
    #[error("can't decode InitializerController {config}: {message}")]
    DecodeFailure {
        /// Name of the configuration record, if it had one
        config: String,
        /// Description of what failed
        message: String,
    },

    /// The init hook rejected the object or could not be called
    #[error("can't initialize {kind} {namespace}/{name}: {message}")]
    HookFailure {
        /// Kind of the object being initialized
        kind: String,
        /// Namespace of the object (empty for cluster-scoped objects)
        namespace: String,
        /// Name of the object
        name: String,
        /// Description of what failed
        message: String,
    },

    /// Writing the initialized object back was rejected
    #[error("can't update {kind} {namespace}/{name}: {message}")]
    UpdateFailure {
        /// Kind of the object being written
        kind: String,
        /// Namespace of the object (empty for cluster-scoped objects)
        namespace: String,
        /// Name of the object
        name: String,
        /// Description of what failed
        message: String,
    },

    /// Webhook transport error (connection, status code, response body)
    #[error("webhook error: {0}")]
    Webhook(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Create a list failure for the given collection
    pub fn list_failure(resource: impl Into<String>, msg: impl fmt::Display) -> Self {
        Self::ListFailure {
            resource: resource.into(),
            message: msg.to_string(),
        }
    }

    /// Create a decode failure for the named configuration
    pub fn decode_failure(config: impl Into<String>, msg: impl fmt::Display) -> Self {
        Self::DecodeFailure {
            config: config.into(),
            message: msg.to_string(),
        }
    }

    /// Create a hook failure for the identified object
    pub fn hook_failure(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        msg: impl fmt::Display,
    ) -> Self {
        Self::HookFailure {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            message: msg.to_string(),
        }
    }

    /// Create an update failure for the identified object
    pub fn update_failure(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        msg: impl fmt::Display,
    ) -> Self {
        Self::UpdateFailure {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            message: msg.to_string(),
        }
    }

    /// Create a webhook transport error with the given message
    pub fn webhook(msg: impl Into<String>) -> Self {
        Self::Webhook(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Identity of the object this error is about, as `(kind, namespace, name)`
    pub fn object(&self) -> Option<(&str, &str, &str)> {
        match self {
            Error::HookFailure {
                kind,
                namespace,
                name,
                ..
            }
            | Error::UpdateFailure {
                kind,
                namespace,
                name,
                ..
            } => Some((kind, namespace, name)),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Composite of zero or more independent failures from one fan-out step
///
/// Objects within a resource, resources within a configuration, and
/// configurations within a pass each collect their children's failures
/// here and keep going. Order of insertion is preserved.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<Error>,
}

impl AggregateError {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure
    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }

    /// Fold the failures of a child fan-out step into this one
    pub fn merge(&mut self, other: AggregateError) {
        self.errors.extend(other.errors);
    }

    /// Number of recorded failures
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no failure has been recorded
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The recorded failures, in the order they happened
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// `Ok(())` when nothing failed, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Error> for AggregateError {
    fn from(error: Error) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl Extend<Error> for AggregateError {
    fn extend<T: IntoIterator<Item = Error>>(&mut self, iter: T) {
        self.errors.extend(iter);
    }
}

impl IntoIterator for AggregateError {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => Ok(()),
            [only] => write!(f, "{only}"),
            many => {
                f.write_str("[")?;
                for (i, e) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl std::error::Error for AggregateError {}
