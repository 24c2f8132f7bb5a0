//! Init hook invocation
//!
//! A hook receives the candidate object and returns the object to write
//! back, optionally with a free-form result to record on it. Hooks are
//! called at most once per object per pass and are never retried here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

#[cfg(test)]
use mockall::automock;

use crate::crd::InitializerController;
use crate::object::CandidateObject;
use crate::Error;

/// Body POSTed to an init hook
#[derive(Debug, Serialize)]
pub struct HookRequest<'a> {
    /// The object as it was listed
    pub object: &'a CandidateObject,
}

/// Body returned by an init hook
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct HookResponse {
    /// The (possibly transformed) object
    pub object: CandidateObject,

    /// Result to attach as `metadata.initializers.result`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl HookResponse {
    /// A response returning `object` with no result
    pub fn new(object: CandidateObject) -> Self {
        Self {
            object,
            result: None,
        }
    }

    /// Attach a result to the response
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// Trait abstracting the call to a controller's init hook
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HookInvoker: Send + Sync {
    /// Call `config`'s init hook for `object`
    async fn invoke(
        &self,
        config: &InitializerController,
        object: &CandidateObject,
    ) -> Result<HookResponse, Error>;
}

/// [`HookInvoker`] that POSTs JSON to the configured webhook
pub struct WebhookInvoker {
    http: reqwest::Client,
}

impl WebhookInvoker {
    /// Create a new invoker with its own HTTP connection pool
    pub fn new() -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::webhook(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HookInvoker for WebhookInvoker {
    #[instrument(
        skip(self, config, object),
        fields(config = %config.config_name(), name = %object.name())
    )]
    async fn invoke(
        &self,
        config: &InitializerController,
        object: &CandidateObject,
    ) -> Result<HookResponse, Error> {
        let webhook = config.init_webhook().ok_or_else(|| {
            Error::validation(format!(
                "InitializerController {} has no init webhook",
                config.config_name()
            ))
        })?;
        let url = webhook.resolve_url()?;
        let timeout = webhook.timeout()?;

        debug!(url = %url, timeout_ms = timeout.as_millis(), "calling init hook");

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(&HookRequest { object })
            .send()
            .await
            .map_err(|e| Error::webhook(format!("POST {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::webhook(format!(
                "POST {url} returned {status}: {body}"
            )));
        }

        let hook_response: HookResponse = response
            .json()
            .await
            .map_err(|e| Error::webhook(format!("can't decode response from {url}: {e}")))?;

        if !hook_response.object.as_value().is_object() {
            return Err(Error::webhook(format!(
                "response from {url} did not contain an object"
            )));
        }
        Ok(hook_response)
    }
}
