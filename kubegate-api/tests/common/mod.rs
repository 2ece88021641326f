//! Common test utilities and helpers
//!
//! An in-memory control plane standing in for a cluster's API server, a
//! connector handing it out, and builders for the objects tests seed it with.

#![allow(dead_code)]

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{
    Deployment, DeploymentSpec, DeploymentStatus, ReplicaSet, ReplicaSetSpec,
};
use k8s_openapi::api::core::v1::{
    Container, Event, Namespace, NamespaceStatus, Node, NodeCondition, NodeSpec, NodeStatus,
    ObjectReference, Pod, PodSpec, PodStatus, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    LabelSelector, ObjectMeta, OwnerReference, Time,
};
use kube::core::{ApiResource, DynamicObject};
use kubegate_api::kubernetes::client::{ClientConnector, ControlPlane};
use kubegate_api::kubernetes::credentials::{ClusterCredential, MemoryCredentialStore};
use kubegate_api::kubernetes::error::{K8sError, K8sResult};
use kubegate_api::kubernetes::registry::ClusterRegistry;
use kubegate_api::kubernetes::types::K8sVersion;
use kubegate_api::{GatewayConfig, KubeGateway};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const CLUSTER: &str = "prod";

type ObjectKey = (String, String, String);

/// Patch recorded by the fake: (plural, namespace, name, patch)
pub type RecordedPatch = (String, String, String, Value);

/// In-memory API server for one cluster
#[derive(Default)]
pub struct FakeControlPlane {
    cluster_id: String,
    objects: Mutex<BTreeMap<ObjectKey, DynamicObject>>,
    patches: Mutex<Vec<RecordedPatch>>,
    /// (operation, object name) -> upstream status code
    failures: Mutex<HashMap<(String, String), u16>>,
    calls: AtomicUsize,
}

impl FakeControlPlane {
    pub fn new(cluster_id: &str) -> Arc<Self> {
        Arc::new(Self {
            cluster_id: cluster_id.to_string(),
            ..Default::default()
        })
    }

    /// Store a typed object
    pub fn seed<K: kube::Resource<DynamicType = ()> + Serialize>(&self, object: &K) {
        let resource = ApiResource::erase::<K>(&());
        let value = serde_json::to_value(object).unwrap();
        let obj: DynamicObject = serde_json::from_value(value).unwrap();
        let key = (
            resource.plural,
            obj.metadata.namespace.clone().unwrap_or_default(),
            obj.metadata.name.clone().unwrap_or_default(),
        );
        self.objects.lock().unwrap().insert(key, obj);
    }

    /// Make `operation` ("list", "get", "delete", "patch") on `name` fail
    pub fn fail(&self, operation: &str, name: &str, code: u16) {
        self.failures
            .lock()
            .unwrap()
            .insert((operation.to_string(), name.to_string()), code);
    }

    pub fn contains(&self, plural: &str, namespace: &str, name: &str) -> bool {
        self.objects.lock().unwrap().contains_key(&(
            plural.to_string(),
            namespace.to_string(),
            name.to_string(),
        ))
    }

    /// Stored object as plain JSON
    pub fn object(&self, plural: &str, namespace: &str, name: &str) -> Option<Value> {
        self.objects
            .lock()
            .unwrap()
            .get(&(plural.to_string(), namespace.to_string(), name.to_string()))
            .map(|o| serde_json::to_value(o).unwrap())
    }

    pub fn patches(&self) -> Vec<RecordedPatch> {
        self.patches.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(
        &self,
        operation: &str,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let code = self
            .failures
            .lock()
            .unwrap()
            .get(&(operation.to_string(), name.to_string()))
            .copied();

        match code {
            None => Ok(()),
            Some(404) => Err(not_found(resource, namespace, name)),
            Some(code) => Err(K8sError::Upstream {
                code,
                reason: "Injected".to_string(),
                message: format!("{} {} failed", operation, name),
            }),
        }
    }
}

fn not_found(resource: &ApiResource, namespace: &str, name: &str) -> K8sError {
    K8sError::ResourceNotFound {
        kind: resource.kind.clone(),
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

fn key(resource: &ApiResource, namespace: Option<&str>, name: &str) -> ObjectKey {
    (
        resource.plural.clone(),
        namespace.unwrap_or_default().to_string(),
        name.to_string(),
    )
}

fn matches_selector(obj: &DynamicObject, selector: &str) -> bool {
    let labels = obj.metadata.labels.clone().unwrap_or_default();
    selector
        .split(',')
        .filter(|s| !s.is_empty())
        .all(|pair| match pair.split_once('=') {
            Some((k, v)) => labels.get(k).map(String::as_str) == Some(v),
            None => labels.contains_key(pair),
        })
}

/// JSON merge patch
fn merge(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(fields) => {
            if !target.is_object() {
                *target = Value::Object(Default::default());
            }
            if let Value::Object(map) = target {
                for (k, v) in fields {
                    if v.is_null() {
                        map.remove(k);
                    } else {
                        merge(map.entry(k.clone()).or_insert(Value::Null), v);
                    }
                }
            }
        }
        other => *target = other.clone(),
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> K8sResult<Vec<DynamicObject>> {
        self.check("list", resource, namespace.unwrap_or_default(), "")?;

        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|((plural, ns, _), _)| {
                *plural == resource.plural && namespace.map_or(true, |n| n == ns)
            })
            .map(|(_, obj)| obj)
            .filter(|obj| label_selector.map_or(true, |s| matches_selector(obj, s)))
            .cloned()
            .map(|mut obj| {
                // Real list responses drop the per-item type meta
                obj.types = None;
                obj
            })
            .collect())
    }

    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> K8sResult<DynamicObject> {
        let ns = namespace.unwrap_or_default();
        self.check("get", resource, ns, name)?;

        self.objects
            .lock()
            .unwrap()
            .get(&key(resource, namespace, name))
            .cloned()
            .ok_or_else(|| not_found(resource, ns, name))
    }

    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> K8sResult<()> {
        let ns = namespace.unwrap_or_default();
        self.check("delete", resource, ns, name)?;

        self.objects
            .lock()
            .unwrap()
            .remove(&key(resource, namespace, name))
            .map(|_| ())
            .ok_or_else(|| not_found(resource, ns, name))
    }

    async fn patch(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        patch: &Value,
    ) -> K8sResult<()> {
        let ns = namespace.unwrap_or_default();
        self.check("patch", resource, ns, name)?;

        let mut objects = self.objects.lock().unwrap();
        let obj = objects
            .get_mut(&key(resource, namespace, name))
            .ok_or_else(|| not_found(resource, ns, name))?;

        let mut value = serde_json::to_value(&*obj).unwrap();
        merge(&mut value, patch);
        *obj = serde_json::from_value(value).unwrap();

        self.patches.lock().unwrap().push((
            resource.plural.clone(),
            ns.to_string(),
            name.to_string(),
            patch.clone(),
        ));
        Ok(())
    }

    async fn server_version(&self) -> K8sResult<K8sVersion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(K8sVersion {
            server: "1.32".to_string(),
            git_version: "v1.32.0".to_string(),
            git_commit: "fake".to_string(),
            build_date: "2025-01-01T00:00:00Z".to_string(),
            platform: "linux/amd64".to_string(),
        })
    }
}

/// Client handle built by one connect: the shared fake plane tagged with the
/// fingerprint of the credential it was built from
pub struct ConnectedPlane {
    plane: Arc<FakeControlPlane>,
    fingerprint: String,
}

impl ConnectedPlane {
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[async_trait]
impl ControlPlane for ConnectedPlane {
    fn cluster_id(&self) -> &str {
        self.plane.cluster_id()
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> K8sResult<Vec<DynamicObject>> {
        self.plane.list(resource, namespace, label_selector).await
    }

    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> K8sResult<DynamicObject> {
        self.plane.get(resource, namespace, name).await
    }

    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> K8sResult<()> {
        self.plane.delete(resource, namespace, name).await
    }

    async fn patch(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        patch: &Value,
    ) -> K8sResult<()> {
        self.plane.patch(resource, namespace, name, patch).await
    }

    async fn server_version(&self) -> K8sResult<K8sVersion> {
        self.plane.server_version().await
    }
}

/// Hands out registered fake planes and counts connects
#[derive(Default)]
pub struct FakeConnector {
    planes: Mutex<HashMap<String, Arc<FakeControlPlane>>>,
    /// Every client built, with the fingerprint it was built from
    built: Mutex<Vec<(String, Arc<dyn ControlPlane>)>>,
    /// kubeconfig -> gate a connect waits on before finishing
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    refused_configs: Mutex<HashSet<String>>,
    connects: AtomicUsize,
    refuse: AtomicBool,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, plane: Arc<FakeControlPlane>) {
        self.planes
            .lock()
            .unwrap()
            .insert(plane.cluster_id.clone(), plane);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Fail every following connect
    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Fail connects made with this kubeconfig
    pub fn refuse_config(&self, kubeconfig: &str) {
        self.refused_configs
            .lock()
            .unwrap()
            .insert(kubeconfig.to_string());
    }

    /// Hold connects made with this kubeconfig until the returned gate is notified
    pub fn hold(&self, kubeconfig: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(kubeconfig.to_string(), gate.clone());
        gate
    }

    /// Client built from the credential with this fingerprint
    pub fn built_for(&self, fingerprint: &str) -> Option<Arc<dyn ControlPlane>> {
        self.built
            .lock()
            .unwrap()
            .iter()
            .find(|(fp, _)| fp == fingerprint)
            .map(|(_, client)| client.clone())
    }

    /// Fingerprint the given client was built from
    pub fn fingerprint_of(&self, client: &Arc<dyn ControlPlane>) -> Option<String> {
        self.built
            .lock()
            .unwrap()
            .iter()
            .find(|(_, c)| {
                std::ptr::eq(Arc::as_ptr(c) as *const (), Arc::as_ptr(client) as *const ())
            })
            .map(|(fp, _)| fp.clone())
    }

    /// Wait until at least `n` connects have started
    pub async fn wait_for_connects(&self, n: usize) {
        while self.connects() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl ClientConnector for FakeConnector {
    async fn connect(&self, credential: &ClusterCredential) -> K8sResult<Arc<dyn ControlPlane>> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let gate = self
            .gates
            .lock()
            .unwrap()
            .get(&credential.kubeconfig)
            .cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let refused = self.refuse.load(Ordering::SeqCst)
            || self
                .refused_configs
                .lock()
                .unwrap()
                .contains(&credential.kubeconfig);
        if refused {
            return Err(K8sError::ConnectionFailed {
                cluster_id: credential.cluster_id.clone(),
                message: "connection refused".to_string(),
            });
        }

        let plane = self
            .planes
            .lock()
            .unwrap()
            .get(&credential.cluster_id)
            .cloned()
            .unwrap_or_else(|| FakeControlPlane::new(&credential.cluster_id));

        let client: Arc<dyn ControlPlane> = Arc::new(ConnectedPlane {
            plane,
            fingerprint: credential.fingerprint.clone(),
        });
        self.built
            .lock()
            .unwrap()
            .push((credential.fingerprint.clone(), client.clone()));
        Ok(client)
    }
}

/// Everything a gateway test needs to poke at
pub struct TestEnv {
    pub gateway: KubeGateway,
    pub plane: Arc<FakeControlPlane>,
    pub connector: Arc<FakeConnector>,
    pub store: Arc<MemoryCredentialStore>,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_config(GatewayConfig::default()).await
    }

    pub async fn with_config(config: GatewayConfig) -> Self {
        let plane = FakeControlPlane::new(CLUSTER);
        let connector = FakeConnector::new();
        connector.register(plane.clone());

        let store = Arc::new(MemoryCredentialStore::new());
        store.upsert(CLUSTER, "Production", "kubeconfig-v1", None).await;

        let registry = Arc::new(ClusterRegistry::new(store.clone(), connector.clone()));
        let gateway = KubeGateway::new(registry, &config);

        Self {
            gateway,
            plane,
            connector,
            store,
        }
    }
}

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn meta(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
        ..Default::default()
    }
}

/// Timestamp `secs` seconds after the epoch
pub fn at(secs: i64) -> Time {
    Time(chrono::DateTime::from_timestamp(secs, 0).unwrap())
}

fn pod_template(app: &str, image: &str) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels(&[("app", app)])),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: vec![Container {
                name: app.to_string(),
                image: Some(image.to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }),
    }
}

/// Deployment selecting `app=<name>`, uid `uid-<name>`
pub fn deployment(namespace: &str, name: &str, replicas: i32) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            uid: Some(format!("uid-{}", name)),
            labels: Some(labels(&[("app", name)])),
            ..meta(namespace, name)
        },
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(labels(&[("app", name)])),
                ..Default::default()
            },
            template: pod_template(name, &format!("{}:v1", name)),
            ..Default::default()
        }),
        status: Some(DeploymentStatus {
            ready_replicas: Some(replicas),
            ..Default::default()
        }),
    }
}

/// ReplicaSet of `owner` at `revision`, running `image`
pub fn replicaset(namespace: &str, owner: &str, revision: i64, image: &str) -> ReplicaSet {
    let mut template = pod_template(owner, image);
    if let Some(labels) = template.metadata.as_mut().and_then(|m| m.labels.as_mut()) {
        labels.insert("pod-template-hash".to_string(), format!("h{}", revision));
    }

    let rev = revision.to_string();

    ReplicaSet {
        metadata: ObjectMeta {
            labels: Some(labels(&[("app", owner)])),
            annotations: Some(labels(&[("deployment.kubernetes.io/revision", rev.as_str())])),
            owner_references: Some(vec![OwnerReference {
                api_version: "apps/v1".to_string(),
                kind: "Deployment".to_string(),
                name: owner.to_string(),
                uid: format!("uid-{}", owner),
                ..Default::default()
            }]),
            ..meta(namespace, &format!("{}-{}", owner, revision))
        },
        spec: Some(ReplicaSetSpec {
            selector: LabelSelector {
                match_labels: Some(labels(&[("app", owner)])),
                ..Default::default()
            },
            template: Some(template),
            ..Default::default()
        }),
        status: None,
    }
}

/// ClusterIP service selecting `app=<app>`
pub fn service(namespace: &str, name: &str, app: &str) -> Service {
    Service {
        metadata: meta(namespace, name),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(labels(&[("app", app)])),
            ports: Some(vec![ServicePort {
                port: 80,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn pod(namespace: &str, name: &str, created: i64, phase: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            creation_timestamp: Some(at(created)),
            ..meta(namespace, name)
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "main".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
    }
}

pub fn node(name: &str) -> Node {
    Node {
        metadata: meta("", name),
        spec: Some(NodeSpec::default()),
        status: None,
    }
}

/// Node whose Ready condition is `ready`
pub fn ready_node(name: &str, ready: bool) -> Node {
    Node {
        status: Some(NodeStatus {
            conditions: Some(vec![NodeCondition {
                type_: "Ready".to_string(),
                status: if ready { "True" } else { "False" }.to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..node(name)
    }
}

pub fn namespace(name: &str, created: i64) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            creation_timestamp: Some(at(created)),
            ..meta("", name)
        },
        spec: None,
        status: Some(NamespaceStatus {
            phase: Some("Active".to_string()),
            ..Default::default()
        }),
    }
}

/// Event of `type_` about the pod `pod`
pub fn event(namespace: &str, name: &str, pod: &str, type_: &str, created: i64) -> Event {
    Event {
        metadata: ObjectMeta {
            creation_timestamp: Some(at(created)),
            ..meta(namespace, name)
        },
        involved_object: ObjectReference {
            kind: Some("Pod".to_string()),
            name: Some(pod.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some(type_.to_string()),
        reason: Some(if type_ == "Warning" { "BackOff" } else { "Pulled" }.to_string()),
        count: Some(1),
        ..Default::default()
    }
}
