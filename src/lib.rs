//! Initializer Controller - ordered, cooperative initialization of Kubernetes objects
//!
//! Objects created with a pending-initializer queue stay invisible to normal
//! clients until every initializer named in the queue has processed them.
//! Each InitializerController names one initializer and the resources it
//! cares about; the controller hands every object whose queue is headed by
//! that initializer to a webhook, then pops the head and writes the object
//! back.
//!
//! # Modules
//!
//! - [`crd`] - The InitializerController custom resource
//! - [`queue`] - Pending-queue eligibility and next-state rules
//! - [`object`] - Unstructured candidate objects
//! - [`accessor`] - List/update access to arbitrary resources
//! - [`hook`] - Initializer hook invocation
//! - [`controller`] - Reconciliation passes
//! - [`telemetry`] - Logging setup
//! - [`error`] - Error types for the controller

#![deny(missing_docs)]

pub mod accessor;
pub mod controller;
pub mod crd;
pub mod error;
pub mod hook;
pub mod object;
pub mod queue;
pub mod telemetry;

pub use error::{AggregateError, Error};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default interval between reconciliation passes, in seconds
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "initializer-controller";
