//! Registry-wide reconciliation pass
//!
//! One pass lists every registered InitializerController, decodes each, and
//! sweeps its resources. Configurations are independent: a record that
//! can't be decoded, or a controller whose sweep fails, is logged and the
//! pass moves on. Only failing to list the configurations at all ends the
//! pass early.

use async_trait::async_trait;
use kube::Resource;
use serde_json::Value;
use tracing::{error, info, instrument};

#[cfg(test)]
use mockall::automock;

use super::sweep::sweep_controller;
use super::Context;
use crate::accessor::{ResourceAccessor, ResourceTarget};
use crate::crd::InitializerController;
use crate::Error;

/// Trait abstracting retrieval of raw InitializerController records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// List every registered configuration, undecoded
    async fn list_controller_configs(&self) -> Result<Vec<Value>, Error>;
}

/// [`ConfigSource`] reading InitializerControllers from the cluster
pub struct KubeConfigSource<A> {
    accessor: A,
}

impl<A: ResourceAccessor> KubeConfigSource<A> {
    /// Read configurations through `accessor`
    pub fn new(accessor: A) -> Self {
        Self { accessor }
    }
}

/// The cluster-scoped InitializerController collection
pub fn config_target() -> ResourceTarget {
    ResourceTarget::new(
        InitializerController::api_version(&()),
        InitializerController::plural(&()),
    )
}

#[async_trait]
impl<A: ResourceAccessor> ConfigSource for KubeConfigSource<A> {
    async fn list_controller_configs(&self) -> Result<Vec<Value>, Error> {
        let records = self.accessor.list(&config_target(), "").await?;
        Ok(records.into_iter().map(|r| r.into_value()).collect())
    }
}

/// Outcome of one pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Configurations decoded and swept
    pub swept: usize,
    /// Records skipped because they could not be decoded
    pub decode_failures: usize,
    /// Names of swept configurations that reported failures
    pub failed_configs: Vec<String>,
    /// Total failures across all sweeps
    pub failures: usize,
}

/// Run one reconciliation pass over every registered configuration
///
/// Returns an error only when the configurations themselves can't be listed.
#[instrument(skip(ctx))]
pub async fn sync_all(ctx: &Context) -> Result<SyncSummary, Error> {
    let records = ctx
        .configs
        .list_controller_configs()
        .await
        .map_err(|e| Error::list_failure(config_target().to_string(), e))?;

    let mut summary = SyncSummary::default();
    for raw in records {
        let config = match InitializerController::decode(raw) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "skipping InitializerController");
                summary.decode_failures += 1;
                continue;
            }
        };

        summary.swept += 1;
        if let Err(errors) =
            sweep_controller(ctx.accessor.as_ref(), ctx.hooks.as_ref(), &config).await
        {
            error!(
                config = %config.config_name(),
                failures = errors.len(),
                error = %errors,
                "sync InitializerController failed"
            );
            summary.failures += errors.len();
            summary
                .failed_configs
                .push(config.config_name().to_string());
        }
    }

    info!(
        swept = summary.swept,
        decode_failures = summary.decode_failures,
        failures = summary.failures,
        "sync pass complete"
    );
    Ok(summary)
}
