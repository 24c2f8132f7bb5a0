//! Supporting types for the InitializerController CRD

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Hook timeout used when the webhook does not set one
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// A set of resources within one API group/version
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupVersionResources {
    /// API group and version (e.g., "v1", "apps/v1")
    pub api_version: String,

    /// Plural resource names within the group/version (e.g., "pods")
    #[serde(default)]
    pub resources: Vec<String>,
}

/// Hooks called by the controller
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitializerControllerHooks {
    /// Hook called for each object whose pending queue is headed by this
    /// controller's initializer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Hook>,
}

/// A single hook definition
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    /// Webhook target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookSpec>,
}

/// Where and how to call a webhook
///
/// Exactly one of `url` or `service` must be set.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSpec {
    /// Absolute URL of the webhook
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// In-cluster Service serving the webhook
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceReference>,

    /// Request path when calling a Service (e.g., "/init")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Request timeout as a duration string (e.g., "10s", "500ms", "1m30s")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl WebhookSpec {
    /// Resolve the URL to POST hook requests to
    pub fn resolve_url(&self) -> Result<String, Error> {
        match (&self.url, &self.service) {
            (Some(_), Some(_)) => Err(Error::validation(
                "webhook cannot set both 'url' and 'service'",
            )),
            (Some(url), None) => Ok(url.clone()),
            (None, Some(svc)) => Ok(format!(
                "{}://{}.{}:{}{}",
                svc.protocol.as_deref().unwrap_or("http"),
                svc.name,
                svc.namespace,
                svc.port.unwrap_or(80),
                self.path.as_deref().unwrap_or_default()
            )),
            (None, None) => Err(Error::validation(
                "webhook must set either 'url' or 'service'",
            )),
        }
    }

    /// Request timeout, falling back to [`DEFAULT_HOOK_TIMEOUT`]
    pub fn timeout(&self) -> Result<Duration, Error> {
        match self.timeout.as_deref() {
            Some(raw) => parse_duration(raw),
            None => Ok(DEFAULT_HOOK_TIMEOUT),
        }
    }
}

/// Reference to a Service in the cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReference {
    /// Service name
    pub name: String,

    /// Service namespace
    pub namespace: String,

    /// Service port (default 80)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// "http" (default) or "https"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// Parse a duration such as "10s", "250ms", "1m30s" or "1h"
pub fn parse_duration(raw: &str) -> Result<Duration, Error> {
    let invalid = || Error::validation(format!("invalid duration '{raw}'"));
    let s = raw.trim();
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(invalid)?;
        if digits == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let secs_per_unit = match &rest[..unit_len] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        let part = Duration::try_from_secs_f64(value * secs_per_unit).map_err(|_| invalid())?;
        total = total.checked_add(part).ok_or_else(invalid)?;
    }
    if total.is_zero() {
        return Err(Error::validation(format!(
            "duration '{raw}' must be greater than zero"
        )));
    }
    Ok(total)
}
