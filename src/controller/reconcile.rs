//! Per-resource reconciliation
//!
//! Lists every object of one resource, lets the controller's initializer act
//! on the objects whose pending queue it heads, and writes them back. Each
//! object is handled independently: one object's failure is recorded and the
//! rest of the batch carries on.

use tracing::{debug, info, instrument};

use crate::accessor::{ResourceAccessor, ResourceTarget};
use crate::crd::InitializerController;
use crate::error::AggregateError;
use crate::hook::{HookInvoker, HookResponse};
use crate::object::CandidateObject;
use crate::queue::{is_eligible, next_queue_state};
use crate::Error;

/// Run `config`'s initializer over every uninitialized object of `target`
///
/// Each eligible object gets at most one hook call and one write in a pass.
/// All failures are returned together; none stops the batch.
#[instrument(
    skip(accessor, hooks, config, target),
    fields(config = %config.config_name(), target = %target)
)]
pub async fn reconcile_resource(
    accessor: &dyn ResourceAccessor,
    hooks: &dyn HookInvoker,
    config: &InitializerController,
    target: &ResourceTarget,
) -> Result<(), AggregateError> {
    let objects = accessor
        .list(target, "")
        .await
        .map_err(|e| Error::list_failure(target.to_string(), e))?;

    let mut errors = AggregateError::new();
    for object in &objects {
        if let Err(e) = initialize_object(accessor, hooks, config, target, object).await {
            errors.push(e);
        }
    }
    errors.into_result()
}

/// Initialize one object if this controller's initializer heads its queue
async fn initialize_object(
    accessor: &dyn ResourceAccessor,
    hooks: &dyn HookInvoker,
    config: &InitializerController,
    target: &ResourceTarget,
    uninitialized: &CandidateObject,
) -> Result<(), Error> {
    let pending = uninitialized.pending_queue();
    if !is_eligible(&pending, config.initializer_name()) {
        if !pending.is_empty() {
            debug!(
                namespace = %uninitialized.namespace(),
                name = %uninitialized.name(),
                head = ?pending.head_name(),
                "not at head of pending initializers"
            );
        }
        return Ok(());
    }

    let hook_failure = |e: Error| {
        Error::hook_failure(
            uninitialized.kind(),
            uninitialized.namespace(),
            uninitialized.name(),
            e,
        )
    };

    let HookResponse {
        object: mut initialized,
        result,
    } = hooks
        .invoke(config, uninitialized)
        .await
        .map_err(hook_failure)?;

    // The next state comes from the queue we listed, not whatever the hook
    // echoed back.
    initialized
        .apply_queue_update(next_queue_state(&pending))
        .map_err(hook_failure)?;
    if let Some(result) = result {
        initialized.set_result(result).map_err(hook_failure)?;
    }

    info!(
        kind = %initialized.kind(),
        namespace = %initialized.namespace(),
        name = %initialized.name(),
        "updating initialized object"
    );
    accessor
        .update(target, initialized.namespace(), &initialized)
        .await
        .map_err(|e| {
            Error::update_failure(
                initialized.kind(),
                initialized.namespace(),
                initialized.name(),
                e,
            )
        })?;
    Ok(())
}
