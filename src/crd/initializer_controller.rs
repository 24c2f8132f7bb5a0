//! InitializerController Custom Resource Definition
//!
//! An InitializerController registers one initializer: the name it answers
//! to at the head of an object's pending queue, the resources it watches,
//! and the hook that does the actual initialization work.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{GroupVersionResources, InitializerControllerHooks, WebhookSpec};
use crate::accessor::ResourceTarget;
use crate::Error;

/// Name used in errors for records without `metadata.name`
const UNNAMED: &str = "<unnamed>";

/// Specification for an InitializerController
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "metacontroller.k8s.io",
    version = "v1alpha1",
    kind = "InitializerController",
    plural = "initializercontrollers",
    shortname = "ic",
    namespaced = false,
    printcolumn = r#"{"name":"Initializer","type":"string","jsonPath":".spec.initializerName"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InitializerControllerSpec {
    /// Initializer name this controller acts on when it heads a pending queue
    pub initializer_name: String,

    /// Resources to look for uninitialized objects in, in processing order
    #[serde(default)]
    pub uninitialized_resources: Vec<GroupVersionResources>,

    /// Hooks to call
    #[serde(default)]
    pub hooks: InitializerControllerHooks,
}

impl InitializerController {
    /// Decode a raw configuration record into its typed form
    ///
    /// Failures name the record so the offending object can be found.
    pub fn decode(raw: Value) -> Result<Self, Error> {
        let name = raw
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or(UNNAMED)
            .to_string();

        let ic: InitializerController =
            serde_json::from_value(raw).map_err(|e| Error::decode_failure(&name, e))?;
        if ic.spec.initializer_name.is_empty() {
            return Err(Error::decode_failure(&name, "spec.initializerName is empty"));
        }
        Ok(ic)
    }

    /// Name of this configuration
    pub fn config_name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or(UNNAMED)
    }

    /// The initializer name to look for at the head of pending queues
    pub fn initializer_name(&self) -> &str {
        &self.spec.initializer_name
    }

    /// Resource targets in declaration order, group-major
    pub fn targets(&self) -> Vec<ResourceTarget> {
        self.spec
            .uninitialized_resources
            .iter()
            .flat_map(|group| {
                group
                    .resources
                    .iter()
                    .map(|resource| ResourceTarget::new(&group.api_version, resource))
            })
            .collect()
    }

    /// The init hook's webhook, if configured
    pub fn init_webhook(&self) -> Option<&WebhookSpec> {
        self.spec.hooks.init.as_ref()?.webhook.as_ref()
    }
}
