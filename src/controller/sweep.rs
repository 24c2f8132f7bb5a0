//! Per-configuration sweep over its declared resources

use tracing::{debug, instrument};

use super::reconcile::reconcile_resource;
use crate::accessor::ResourceAccessor;
use crate::crd::InitializerController;
use crate::error::AggregateError;
use crate::hook::HookInvoker;

/// Reconcile every resource `config` declares, in declaration order
///
/// A failing resource never stops the sweep; failures from all resources
/// are returned together.
#[instrument(skip(accessor, hooks, config), fields(config = %config.config_name()))]
pub async fn sweep_controller(
    accessor: &dyn ResourceAccessor,
    hooks: &dyn HookInvoker,
    config: &InitializerController,
) -> Result<(), AggregateError> {
    let targets = config.targets();
    debug!(targets = targets.len(), "sweeping resources");

    let mut errors = AggregateError::new();
    for target in &targets {
        if let Err(e) = reconcile_resource(accessor, hooks, config, target).await {
            errors.merge(e);
        }
    }
    errors.into_result()
}
