//! Reconciliation logic for InitializerControllers
//!
//! A pass works top-down: [`sync_all`] lists every registered configuration,
//! [`sweep_controller`] walks the resources one configuration declares, and
//! [`reconcile_resource`] initializes the objects of one resource whose
//! pending queue is headed by that configuration's initializer.

mod reconcile;
mod sweep;
mod sync;

use std::sync::Arc;

use kube::Client;

pub use reconcile::reconcile_resource;
pub use sweep::sweep_controller;
pub use sync::{config_target, sync_all, ConfigSource, KubeConfigSource, SyncSummary};

use crate::accessor::{KubeResourceAccessor, ResourceAccessor};
use crate::hook::{HookInvoker, WebhookInvoker};
use crate::Error;

/// Shared dependencies for a reconciliation pass
///
/// Holds the collaborators as trait objects so passes can run against a
/// real cluster or against test doubles.
pub struct Context {
    /// Lists and updates objects of arbitrary resources
    pub accessor: Arc<dyn ResourceAccessor>,
    /// Calls initializer hooks
    pub hooks: Arc<dyn HookInvoker>,
    /// Reads the registered InitializerControllers
    pub configs: Arc<dyn ConfigSource>,
}

impl Context {
    /// Create a context backed by the cluster behind `client`
    pub fn new(client: Client) -> Result<Self, Error> {
        let accessor = KubeResourceAccessor::new(client);
        Ok(Self {
            configs: Arc::new(KubeConfigSource::new(accessor.clone())),
            accessor: Arc::new(accessor),
            hooks: Arc::new(WebhookInvoker::new()?),
        })
    }

    /// Assemble a context from explicit collaborators
    pub fn from_parts(
        accessor: Arc<dyn ResourceAccessor>,
        hooks: Arc<dyn HookInvoker>,
        configs: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            accessor,
            hooks,
            configs,
        }
    }
}
