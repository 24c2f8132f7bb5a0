//! End-to-end reconciliation passes against an in-memory cluster
//!
//! These tests drive `sync_all` through the public API only. The fake
//! cluster stores unstructured objects the way the API server would and
//! records every write, so each test can assert on exactly what reached
//! the store.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use initializer_controller::accessor::{ResourceAccessor, ResourceTarget};
use initializer_controller::controller::{sync_all, ConfigSource, Context};
use initializer_controller::crd::InitializerController;
use initializer_controller::hook::{HookInvoker, HookResponse};
use initializer_controller::object::CandidateObject;
use initializer_controller::Error;

// =============================================================================
// Fake cluster
// =============================================================================

type ObjectKey = (String, String, String);

#[derive(Default)]
struct FakeCluster {
    configs: Mutex<Vec<Value>>,
    objects: Mutex<BTreeMap<ObjectKey, Value>>,
    writes: Mutex<Vec<ObjectKey>>,
    reject_updates: Mutex<HashSet<String>>,
}

impl FakeCluster {
    fn add_config(&self, config: Value) {
        self.configs.lock().unwrap().push(config);
    }

    fn add_object(&self, target: &ResourceTarget, object: Value) {
        let object = CandidateObject::new(object);
        let key = (
            target.to_string(),
            object.namespace().to_string(),
            object.name().to_string(),
        );
        self.objects.lock().unwrap().insert(key, object.into_value());
    }

    fn get(&self, target: &ResourceTarget, namespace: &str, name: &str) -> Value {
        self.objects
            .lock()
            .unwrap()
            .get(&(target.to_string(), namespace.to_string(), name.to_string()))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, ns, name)| format!("{ns}/{name}"))
            .collect()
    }

    fn reject_updates_for(&self, name: &str) {
        self.reject_updates.lock().unwrap().insert(name.to_string());
    }
}

#[async_trait]
impl ResourceAccessor for FakeCluster {
    async fn list(
        &self,
        target: &ResourceTarget,
        namespace: &str,
    ) -> Result<Vec<CandidateObject>, Error> {
        let collection = target.to_string();
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((t, ns, _), _)| *t == collection && (namespace.is_empty() || ns == namespace))
            .map(|(_, v)| CandidateObject::new(v.clone()))
            .collect())
    }

    async fn update(
        &self,
        target: &ResourceTarget,
        namespace: &str,
        object: &CandidateObject,
    ) -> Result<CandidateObject, Error> {
        if self.reject_updates.lock().unwrap().contains(object.name()) {
            return Err(Error::validation("409 Conflict"));
        }
        let key = (
            target.to_string(),
            namespace.to_string(),
            object.name().to_string(),
        );
        let mut objects = self.objects.lock().unwrap();
        if !objects.contains_key(&key) {
            return Err(Error::validation("404 Not Found"));
        }
        objects.insert(key.clone(), object.as_value().clone());
        self.writes.lock().unwrap().push(key);
        Ok(object.clone())
    }
}

struct FakeConfigs(Arc<FakeCluster>);

#[async_trait]
impl ConfigSource for FakeConfigs {
    async fn list_controller_configs(&self) -> Result<Vec<Value>, Error> {
        Ok(self.0.configs.lock().unwrap().clone())
    }
}

// =============================================================================
// Fake hooks
// =============================================================================

#[derive(Default)]
struct FakeHooks {
    calls: Mutex<Vec<(String, String)>>,
    results: Mutex<BTreeMap<String, Value>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeHooks {
    fn result_for(&self, initializer: &str, result: Value) {
        self.results
            .lock()
            .unwrap()
            .insert(initializer.to_string(), result);
    }

    fn fail_for_object(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HookInvoker for FakeHooks {
    async fn invoke(
        &self,
        config: &InitializerController,
        object: &CandidateObject,
    ) -> Result<HookResponse, Error> {
        self.calls.lock().unwrap().push((
            config.initializer_name().to_string(),
            object.name().to_string(),
        ));
        if self.failing.lock().unwrap().contains(object.name()) {
            return Err(Error::webhook("500 Internal Server Error"));
        }

        let mut returned = object.as_value().clone();
        returned["metadata"]["labels"][config.initializer_name()] = json!("done");
        let response = HookResponse::new(CandidateObject::new(returned));
        Ok(
            match self.results.lock().unwrap().get(config.initializer_name()) {
                Some(result) => response.with_result(result.clone()),
                None => response,
            },
        )
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn pods() -> ResourceTarget {
    ResourceTarget::new("v1", "pods")
}

fn controller(name: &str, initializer: &str) -> Value {
    json!({
        "apiVersion": "metacontroller.k8s.io/v1alpha1",
        "kind": "InitializerController",
        "metadata": { "name": name },
        "spec": {
            "initializerName": initializer,
            "uninitializedResources": [{ "apiVersion": "v1", "resources": ["pods"] }],
            "hooks": { "init": { "webhook": { "url": "http://hooks.invalid/init" } } }
        }
    })
}

fn pod(name: &str, queue: &[&str]) -> Value {
    let pending: Vec<Value> = queue.iter().map(|n| json!({ "name": n })).collect();
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": "default",
            "initializers": { "pending": pending }
        },
        "spec": { "containers": [{ "name": "app", "image": "nginx" }] }
    })
}

struct Harness {
    cluster: Arc<FakeCluster>,
    hooks: Arc<FakeHooks>,
    ctx: Context,
}

fn harness() -> Harness {
    let cluster = Arc::new(FakeCluster::default());
    let hooks = Arc::new(FakeHooks::default());
    let ctx = Context::from_parts(
        cluster.clone(),
        hooks.clone(),
        Arc::new(FakeConfigs(cluster.clone())),
    );
    Harness {
        cluster,
        hooks,
        ctx,
    }
}

fn pending_names(object: &Value) -> Vec<String> {
    CandidateObject::new(object.clone())
        .pending_queue()
        .entries()
        .iter()
        .filter_map(|e| e["name"].as_str().map(str::to_string))
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

/// Story: The head initializer is popped and the rest of the queue is kept
#[tokio::test]
async fn story_head_initializer_pops_itself() {
    let h = harness();
    h.cluster.add_config(controller("a", "agentA"));
    h.cluster.add_object(&pods(), pod("web-0", &["agentA", "agentB"]));

    let summary = sync_all(&h.ctx).await.unwrap();

    let stored = h.cluster.get(&pods(), "default", "web-0");
    assert_eq!(pending_names(&stored), vec!["agentB"]);
    assert!(stored["metadata"]["initializers"].get("result").is_none());
    assert_eq!(stored["metadata"]["labels"]["agentA"], "done");
    assert_eq!(summary.swept, 1);
    assert!(summary.failed_configs.is_empty());
}

/// Story: The last initializer clears the block and leaves only its result
#[tokio::test]
async fn story_last_initializer_clears_queue_and_records_result() {
    let h = harness();
    h.cluster.add_config(controller("a", "agentA"));
    h.hooks.result_for("agentA", json!({ "status": "ok" }));
    h.cluster.add_object(&pods(), pod("web-0", &["agentA"]));

    sync_all(&h.ctx).await.unwrap();

    let stored = h.cluster.get(&pods(), "default", "web-0");
    assert_eq!(
        stored["metadata"]["initializers"],
        json!({ "result": { "status": "ok" } })
    );
    assert!(!CandidateObject::new(stored).is_uninitialized());
}

/// Story: An initializer that isn't at the head waits its turn
#[tokio::test]
async fn story_non_head_initializer_waits() {
    let h = harness();
    h.cluster.add_config(controller("a", "agentA"));
    h.cluster.add_object(&pods(), pod("web-0", &["agentB", "agentA"]));
    let before = h.cluster.get(&pods(), "default", "web-0");

    sync_all(&h.ctx).await.unwrap();

    assert!(h.hooks.calls().is_empty());
    assert!(h.cluster.writes().is_empty());
    assert_eq!(h.cluster.get(&pods(), "default", "web-0"), before);
}

/// Story: Two controllers on the same resource only touch their own objects
#[tokio::test]
async fn story_controllers_on_same_resource_stay_disjoint() {
    let h = harness();
    h.cluster.add_config(controller("a", "agentA"));
    h.cluster.add_config(controller("b", "agentB"));
    h.cluster.add_object(&pods(), pod("for-a", &["agentA"]));
    h.cluster.add_object(&pods(), pod("for-b", &["agentB"]));

    sync_all(&h.ctx).await.unwrap();

    let mut calls = h.hooks.calls();
    calls.sort();
    assert_eq!(
        calls,
        vec![
            ("agentA".to_string(), "for-a".to_string()),
            ("agentB".to_string(), "for-b".to_string()),
        ]
    );
    let for_a = h.cluster.get(&pods(), "default", "for-a");
    let for_b = h.cluster.get(&pods(), "default", "for-b");
    assert!(for_a["metadata"]["labels"].get("agentB").is_none());
    assert!(for_b["metadata"]["labels"].get("agentA").is_none());
}

/// Story: Controllers run in registry order, so a later controller sees the
/// queue an earlier one just advanced within the same pass
#[tokio::test]
async fn story_queue_advances_through_controllers_in_one_pass() {
    let h = harness();
    h.cluster.add_config(controller("a", "agentA"));
    h.cluster.add_config(controller("b", "agentB"));
    h.cluster.add_object(&pods(), pod("web-0", &["agentA", "agentB"]));

    sync_all(&h.ctx).await.unwrap();

    let stored = h.cluster.get(&pods(), "default", "web-0");
    assert!(!CandidateObject::new(stored.clone()).is_uninitialized());
    assert_eq!(stored["metadata"]["labels"]["agentA"], "done");
    assert_eq!(stored["metadata"]["labels"]["agentB"], "done");
    assert_eq!(h.cluster.writes().len(), 2);
}

// =============================================================================
// Failure isolation
// =============================================================================

/// Story: One failing hook leaves that object untouched while its siblings
/// are initialized, and the failure shows up in the pass summary
#[tokio::test]
async fn story_hook_failure_is_isolated_to_its_object() {
    let h = harness();
    h.cluster.add_config(controller("a", "agentA"));
    for name in ["p1", "p2", "p3"] {
        h.cluster.add_object(&pods(), pod(name, &["agentA", "agentB"]));
    }
    h.hooks.fail_for_object("p2");

    let summary = sync_all(&h.ctx).await.unwrap();

    assert_eq!(summary.failed_configs, vec!["a".to_string()]);
    assert_eq!(summary.failures, 1);
    assert_eq!(
        pending_names(&h.cluster.get(&pods(), "default", "p2")),
        vec!["agentA", "agentB"]
    );
    for name in ["p1", "p3"] {
        assert_eq!(
            pending_names(&h.cluster.get(&pods(), "default", name)),
            vec!["agentB"]
        );
    }
}

/// Story: A rejected write is reported and the object is retried next pass
#[tokio::test]
async fn story_rejected_update_is_retried_next_pass() {
    let h = harness();
    h.cluster.add_config(controller("a", "agentA"));
    h.cluster.add_object(&pods(), pod("web-0", &["agentA"]));
    h.cluster.reject_updates_for("web-0");

    let first = sync_all(&h.ctx).await.unwrap();
    assert_eq!(first.failures, 1);
    assert!(CandidateObject::new(h.cluster.get(&pods(), "default", "web-0")).is_uninitialized());

    h.cluster.reject_updates.lock().unwrap().clear();
    let second = sync_all(&h.ctx).await.unwrap();
    assert_eq!(second.failures, 0);
    assert!(!CandidateObject::new(h.cluster.get(&pods(), "default", "web-0")).is_uninitialized());
    assert_eq!(h.hooks.calls().len(), 2);
}

/// Story: A malformed registry entry is skipped without affecting the rest
#[tokio::test]
async fn story_malformed_config_is_skipped() {
    let h = harness();
    h.cluster.add_config(json!({
        "metadata": { "name": "broken" },
        "spec": { "uninitializedResources": "pods" }
    }));
    h.cluster.add_config(controller("a", "agentA"));
    h.cluster.add_object(&pods(), pod("web-0", &["agentA"]));

    let summary = sync_all(&h.ctx).await.unwrap();

    assert_eq!(summary.decode_failures, 1);
    assert_eq!(summary.swept, 1);
    assert_eq!(h.cluster.writes(), vec!["default/web-0"]);
}

/// Story: Initialized objects are never handed to hooks again
#[tokio::test]
async fn story_second_pass_is_idle() {
    let h = harness();
    h.cluster.add_config(controller("a", "agentA"));
    h.cluster.add_object(&pods(), pod("web-0", &["agentA"]));

    sync_all(&h.ctx).await.unwrap();
    sync_all(&h.ctx).await.unwrap();

    assert_eq!(h.hooks.calls().len(), 1);
    assert_eq!(h.cluster.writes().len(), 1);
}
