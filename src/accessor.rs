//! Generic access to arbitrary resource collections
//!
//! The controller works on kinds it has no compile-time knowledge of, named
//! only by `(apiVersion, resource)`. Objects are moved as unstructured JSON
//! through raw API requests so that every field the server returns, including
//! `metadata.initializers`, is written back as it was read.

use std::fmt;

use async_trait::async_trait;
use kube::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

#[cfg(test)]
use mockall::automock;

use crate::object::CandidateObject;
use crate::Error;

/// A resource collection: an API group/version plus a plural resource name
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceTarget {
    api_version: String,
    resource: String,
}

impl ResourceTarget {
    /// Create a target for `resource` (plural, e.g. "pods") in `api_version`
    pub fn new(api_version: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            resource: resource.into(),
        }
    }

    /// API group and version, e.g. "v1" or "apps/v1"
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Plural resource name
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Collection URL path, across all namespaces when `namespace` is empty
    pub fn collection_path(&self, namespace: &str) -> String {
        let (group, version) = parse_api_version(&self.api_version);
        let mut path = if group.is_empty() {
            format!("/api/{version}")
        } else {
            format!("/apis/{group}/{version}")
        };
        if !namespace.is_empty() {
            path.push_str("/namespaces/");
            path.push_str(namespace);
        }
        path.push('/');
        path.push_str(&self.resource);
        path
    }

    /// URL path of a single object
    pub fn object_path(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.collection_path(namespace), name)
    }
}

impl fmt::Display for ResourceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (group, version) = parse_api_version(&self.api_version);
        if group.is_empty() {
            write!(f, "{}.{}", self.resource, version)
        } else {
            write!(f, "{}.{}.{}", self.resource, version, group)
        }
    }
}

/// Split an apiVersion into `(group, version)`; core resources have an
/// empty group
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Trait abstracting list/update access to any resource collection
///
/// This trait allows mocking the API server in tests while using the real
/// client in production. Objects are never created or deleted through it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceAccessor: Send + Sync {
    /// List all objects in the collection, including uninitialized ones
    ///
    /// An empty `namespace` lists across all namespaces.
    async fn list(
        &self,
        target: &ResourceTarget,
        namespace: &str,
    ) -> Result<Vec<CandidateObject>, Error>;

    /// Replace one object, scoped to `namespace` (empty for cluster scope)
    async fn update(
        &self,
        target: &ResourceTarget,
        namespace: &str,
        object: &CandidateObject,
    ) -> Result<CandidateObject, Error>;
}

/// List response with unstructured items
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawList {
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    items: Vec<Value>,
}

impl RawList {
    /// Items of a list response usually omit `apiVersion` and `kind`; fill
    /// them in from the list itself so every object is self-describing
    fn into_objects(self) -> Vec<CandidateObject> {
        let RawList {
            api_version,
            kind,
            items,
        } = self;
        let item_kind = kind
            .as_deref()
            .and_then(|k| k.strip_suffix("List"))
            .map(str::to_string);

        items
            .into_iter()
            .map(|mut item| {
                if let Some(obj) = item.as_object_mut() {
                    if let Some(api_version) = &api_version {
                        obj.entry("apiVersion")
                            .or_insert_with(|| Value::String(api_version.clone()));
                    }
                    if let Some(kind) = &item_kind {
                        obj.entry("kind")
                            .or_insert_with(|| Value::String(kind.clone()));
                    }
                }
                CandidateObject::new(item)
            })
            .collect()
    }
}

/// Real Kubernetes implementation of [`ResourceAccessor`]
#[derive(Clone)]
pub struct KubeResourceAccessor {
    client: Client,
}

impl KubeResourceAccessor {
    /// Create a new KubeResourceAccessor wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceAccessor for KubeResourceAccessor {
    #[instrument(skip(self, target), fields(target = %target))]
    async fn list(
        &self,
        target: &ResourceTarget,
        namespace: &str,
    ) -> Result<Vec<CandidateObject>, Error> {
        let url = format!(
            "{}?includeUninitialized=true",
            target.collection_path(namespace)
        );
        let request = http::Request::get(&url)
            .body(Vec::new())
            .map_err(|e| Error::validation(format!("invalid list request {url}: {e}")))?;

        let list: RawList = self.client.request(request).await?;
        let objects = list.into_objects();
        debug!(count = objects.len(), "listed objects");
        Ok(objects)
    }

    #[instrument(
        skip(self, target, object),
        fields(target = %target, name = %object.name())
    )]
    async fn update(
        &self,
        target: &ResourceTarget,
        namespace: &str,
        object: &CandidateObject,
    ) -> Result<CandidateObject, Error> {
        let url = target.object_path(namespace, object.name());
        let body = serde_json::to_vec(object.as_value())?;
        let request = http::Request::put(&url)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body)
            .map_err(|e| Error::validation(format!("invalid update request {url}: {e}")))?;

        let updated: Value = self.client.request(request).await?;
        Ok(CandidateObject::new(updated))
    }
}
